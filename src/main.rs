fn main() -> anyhow::Result<()> {
    zen_notes::cli::run()
}
