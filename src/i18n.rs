use crate::model::Language;

/// User-facing strings for one UI language.
#[derive(Debug)]
pub struct Strings {
    pub app_name: &'static str,
    pub all_notes: &'static str,
    pub trash: &'static str,
    pub untitled: &'static str,
    pub no_notes: &'static str,
    pub trash_empty: &'static str,
    pub select_note: &'static str,
    pub note_in_trash: &'static str,
    pub search_placeholder: &'static str,
    pub characters: &'static str,
    pub settings: &'static str,
    pub dark_mode: &'static str,
    pub language: &'static str,
    pub empty_confirm: &'static str,
    pub ai_error: &'static str,
    pub ai_working: &'static str,
    pub ai_menu: &'static str,
    pub summarize: &'static str,
    pub polish: &'static str,
    pub suggest_title: &'static str,
    pub continue_writing: &'static str,
    pub new_category: &'static str,
    pub pinned: &'static str,
}

static EN: Strings = Strings {
    app_name: "Zen Notes",
    all_notes: "All",
    trash: "Trash",
    untitled: "Untitled",
    no_notes: "No notes yet. Press `a` to create one.",
    trash_empty: "Trash is empty.",
    select_note: "Select a note to start writing.",
    note_in_trash: "This note is in the trash. Press `u` to restore it.",
    search_placeholder: "Search notes...",
    characters: "characters",
    settings: "Settings",
    dark_mode: "Dark mode",
    language: "Language",
    empty_confirm: "Permanently delete every note in the trash? This cannot be undone.",
    ai_error: "The AI assistant could not complete the request. Please try again.",
    ai_working: "AI is thinking...",
    ai_menu: "AI Magic",
    summarize: "Summarize",
    polish: "Polish writing",
    suggest_title: "Suggest title",
    continue_writing: "Continue writing",
    new_category: "New category",
    pinned: "Pinned",
};

static ZH: Strings = Strings {
    app_name: "禅记",
    all_notes: "全部",
    trash: "回收站",
    untitled: "无标题",
    no_notes: "还没有笔记。按 `a` 新建一篇。",
    trash_empty: "回收站是空的。",
    select_note: "选择一篇笔记开始写作。",
    note_in_trash: "这篇笔记在回收站中。按 `u` 恢复。",
    search_placeholder: "搜索笔记...",
    characters: "字符",
    settings: "设置",
    dark_mode: "深色模式",
    language: "语言",
    empty_confirm: "确定要永久删除回收站中的所有笔记吗？此操作无法撤销。",
    ai_error: "AI 助手未能完成请求，请稍后重试。",
    ai_working: "AI 正在思考...",
    ai_menu: "AI 魔法",
    summarize: "生成摘要",
    polish: "润色文字",
    suggest_title: "建议标题",
    continue_writing: "继续写作",
    new_category: "新建分类",
    pinned: "已置顶",
};

impl Strings {
    pub fn for_language(language: Language) -> &'static Strings {
        match language {
            Language::En => &EN,
            Language::Zh => &ZH,
        }
    }
}
