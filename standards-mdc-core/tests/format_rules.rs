use standards_mdc_core::config::OutputConfig;
use standards_mdc_core::contract::{RuleRecord, Segment};
use standards_mdc_core::format::{slugify, FilenameAllocator, Formatter};
use standards_mdc_core::writer::validate_filename;

fn rule(title: &str, body: Vec<Segment>) -> RuleRecord {
    RuleRecord {
        title: title.to_string(),
        body,
        source_section_id: None,
    }
}

fn prose(text: &str) -> Segment {
    Segment::Prose(text.to_string())
}

fn code(language: Option<&str>, text: &str) -> Segment {
    Segment::Code {
        language: language.map(str::to_string),
        text: text.to_string(),
    }
}

fn formatter() -> Formatter {
    Formatter::new(&OutputConfig::default())
}

#[test]
fn test_slugify_examples() {
    assert_eq!(slugify("Indentation"), "indentation");
    assert_eq!(slugify("  Casting  "), "casting");
    assert_eq!(
        slugify("Naming Conventions (Functions & Variables)"),
        "naming-conventions-functions-variables"
    );
    assert_eq!(slugify("PHP 8.1 — Typed properties"), "php-81-typed-properties");
    assert_eq!(slugify("Über café"), "ber-caf");
    assert_eq!(slugify("../../etc/passwd"), "etcpasswd");
    assert_eq!(slugify("!!!"), "rule");
    assert_eq!(slugify(""), "rule");
}

#[test]
fn test_slugify_caps_length() {
    let slug = slugify(&"word ".repeat(60));
    assert!(slug.len() <= 96, "slug too long: {}", slug.len());
    assert!(!slug.ends_with('-'));
    assert!(slug.starts_with("word-word"));
}

#[test]
fn test_filenames_are_filesystem_safe_and_stable() {
    let titles = [
        "Indentation",
        "a/b\\c",
        "..",
        ".hidden",
        "tab\tand\nnewline",
        "null\u{0}byte",
        "-leading and trailing-",
        "    ",
        "emoji 🚀 rocket",
        "CON",
    ];
    let formatter = formatter();
    for title in titles {
        let filename = formatter.filename(title);
        assert!(validate_filename(&filename).is_ok(), "{title:?} -> {filename:?}");
        assert!(filename.ends_with(".mdc"), "{filename:?}");
        assert!(!filename.starts_with(['.', '-']), "{filename:?}");
        assert!(
            filename
                .trim_end_matches(".mdc")
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
            "{filename:?}"
        );
        assert_eq!(filename, formatter.filename(title), "unstable for {title:?}");
    }
}

#[test]
fn test_filename_allocator_disambiguates_collisions() {
    let mut allocator = FilenameAllocator::default();

    assert_eq!(allocator.claim("casting.mdc"), "casting.mdc");
    assert_eq!(allocator.claim("casting.mdc"), "casting-2.mdc");
    assert_eq!(allocator.claim("casting.mdc"), "casting-3.mdc");
    assert_eq!(allocator.claim("casting-2.mdc"), "casting-2-2.mdc");
    assert_eq!(allocator.claim("rule"), "rule");
    assert_eq!(allocator.claim("rule"), "rule-2");
}

#[test]
fn test_format_indentation_scenario() {
    let formatted = formatter().format(&rule("Indentation", vec![prose("Use 2 spaces.")]));

    assert_eq!(formatted.filename, "indentation.mdc");
    assert_eq!(
        formatted.content,
        "---\ndescription: Use 2 spaces.\nglobs: \nalwaysApply: false\n---\nUse 2 spaces.\n"
    );
    assert!(formatted.content.lines().any(|l| l == "Use 2 spaces."));
}

#[test]
fn test_format_empty_body_is_header_only() {
    let formatted = formatter().format(&rule("Operators", vec![]));

    assert_eq!(
        formatted.content,
        "---\ndescription: Operators\nglobs: \nalwaysApply: false\n---\n"
    );
}

#[test]
fn test_format_fences_code_unmodified() {
    let config = OutputConfig {
        code_language: Some("php".to_string()),
        ..OutputConfig::default()
    };
    let snippet = "if ($x) { ... }";
    let formatted = Formatter::new(&config).format(&rule(
        "Control structures",
        vec![prose("Always use braces."), code(None, snippet)],
    ));

    assert!(
        formatted
            .content
            .ends_with("Always use braces.\n\n```php\nif ($x) { ... }\n```\n"),
        "{}",
        formatted.content
    );
}

#[test]
fn test_format_prefers_segment_language_and_keeps_inner_whitespace() {
    let config = OutputConfig {
        code_language: Some("php".to_string()),
        ..OutputConfig::default()
    };
    let snippet = "  const a = 1;\n\n\tlet b = a;\n";
    let formatted =
        Formatter::new(&config).format(&rule("Scripts", vec![code(Some("js"), snippet)]));

    assert!(formatted
        .content
        .contains("```js\n  const a = 1;\n\n\tlet b = a;\n```"));
}

#[test]
fn test_format_lengthens_fence_around_backticks() {
    let snippet = "```\nnested\n```";
    let formatted = formatter().format(&rule("Markdown", vec![code(None, snippet)]));

    assert!(formatted.content.contains("````\n```\nnested\n```\n````"));
}

#[test]
fn test_format_is_deterministic() {
    let record = rule(
        "Casting",
        vec![
            prose("Put a space between the (type) and the $variable in a cast."),
            code(Some("php"), "(int) $mynumber;"),
        ],
    );
    let formatter = formatter();

    assert_eq!(formatter.format(&record), formatter.format(&record));
}

#[test]
fn test_format_description_uses_first_prose_and_quotes_when_needed() {
    let formatted = formatter().format(&rule(
        "Notes",
        vec![
            code(None, "x();"),
            prose("Note: this   matters"),
            prose("Second"),
        ],
    ));
    assert!(formatted
        .content
        .contains("description: \"Note: this matters\"\n"));

    let formatted = formatter().format(&rule("List", vec![prose("- first item")]));
    assert!(formatted.content.contains("description: \"- first item\"\n"));

    let formatted = formatter().format(&rule("Quotes", vec![prose("\"quoted\" start")]));
    assert!(formatted
        .content
        .contains("description: \"\\\"quoted\\\" start\"\n"));
}

#[test]
fn test_format_uses_output_config() {
    let config = OutputConfig {
        extension: ".md".to_string(),
        globs: "*.php, *.module".to_string(),
        always_apply: true,
        ..OutputConfig::default()
    };
    let formatted = Formatter::new(&config).format(&rule("Indentation", vec![]));

    assert_eq!(formatted.filename, "indentation.md");
    assert!(formatted.content.contains("\nglobs: *.php, *.module\n"));
    assert!(formatted.content.contains("\nalwaysApply: true\n"));
}

#[test]
fn test_format_quotes_yaml_keywords_and_numbers() {
    for title in ["NULL", "null", "Yes", "off", "True", "~", "42", "1.5", "0x1F", "1e3", ".inf"] {
        let formatted = formatter().format(&rule(title, vec![]));
        let expected = format!("description: \"{title}\"\n");
        assert!(formatted.content.contains(&expected), "{title:?}: {}", formatted.content);
    }

    for title in ["Null values", "Yesterday", "8 spaces", "PHP 8.1"] {
        let formatted = formatter().format(&rule(title, vec![]));
        let expected = format!("description: {title}\n");
        assert!(formatted.content.contains(&expected), "{title:?}: {}", formatted.content);
    }
}
