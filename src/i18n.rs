// ==========================================
// 工数管理系统 - 国际化
// ==========================================
// 画面/接口文言以日语为准, 英语为辅
// rust_i18n::i18n! 宏在 lib.rs 中初始化, 文言位于 locales/*.yml
// ==========================================

/// 已提供文言的语言
pub const SUPPORTED_LOCALES: [&str; 2] = ["ja", "en"];

/// 进程启动时读取的语言环境变量
pub const LOCALE_ENV: &str = "KOUSU_LOCALE";

pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 切换语言, 不支持的语言代码保持当前设置并返回 false
pub fn set_locale(locale: &str) -> bool {
    let Some(supported) = SUPPORTED_LOCALES
        .iter()
        .find(|l| l.eq_ignore_ascii_case(locale.trim()))
    else {
        tracing::warn!(locale, "不支持的语言, 保持 {}", current_locale());
        return false;
    };
    rust_i18n::set_locale(supported);
    true
}

/// 按 KOUSU_LOCALE 设置语言（未设置时保持日语）
pub fn init_from_env() {
    if let Ok(locale) = std::env::var(LOCALE_ENV) {
        set_locale(&locale);
    }
}

/// 翻译
///
/// ```no_run
/// use kousu_management::i18n::t;
/// let label = t("aggregation_status.in_progress");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译并替换 `%{name}` 占位符
///
/// ```no_run
/// use kousu_management::i18n::t_with_args;
/// let msg = t_with_args("import.employee_not_found", &[("id", "E-0001")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    args.iter()
        .fold(t(key), |text, (name, value)| text.replace(&format!("%{{{}}}", name), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // locale 为全局状态, 测试并行执行时需串行化
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        assert!(set_locale("EN"));
        assert_eq!(current_locale(), "en");

        assert!(!set_locale("zh-CN"));
        assert_eq!(current_locale(), "en");

        assert!(set_locale("ja"));
        assert_eq!(current_locale(), "ja");
    }

    #[test]
    fn test_translate_enum_display_names() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("ja");
        assert_eq!(t("aggregation_status.planning"), "企画中");
        assert_eq!(t("weekday.mon"), "月");

        set_locale("en");
        assert_eq!(t("aggregation_status.planning"), "Planning");

        set_locale("ja");
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("ja");
        let msg = t_with_args(
            "import.ticket_mismatch",
            &[("ticket", "T-1"), ("project", "P-9")],
        );
        assert_eq!(msg, "チケット T-1 は案件 P-9 に属していません");

        set_locale("en");
        let msg = t_with_args("import.file_not_found", &[("path", "/tmp/test.csv")]);
        assert!(msg.contains("/tmp/test.csv"));
        assert!(!msg.contains("%{path}"));

        set_locale("ja");
    }
}
