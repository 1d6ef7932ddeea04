//! Inline emphasis: `**bold**` and `` `code` `` runs within a single line.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Plain,
    Bold,
    Code,
}

/// A styled slice of one source line. Delimiters are not included in `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineRun {
    pub kind: RunKind,
    pub text: String,
}

impl InlineRun {
    fn new(kind: RunKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }
}

/// Split a line into plain, bold and code runs.
///
/// Matches are found left to right and never nest. At each position a bold
/// pair is tried before a code pair, each closing at the nearest delimiter.
/// An unmatched `**` or `` ` `` stays in the surrounding plain text.
pub fn format_inline(line: &str) -> Vec<InlineRun> {
    let mut runs = Vec::new();
    let mut plain_start = 0;
    let mut pos = 0;

    while pos < line.len() {
        let rest = &line[pos..];
        let matched = if rest.starts_with("**") {
            rest[2..]
                .find("**")
                .map(|end| (RunKind::Bold, &rest[2..2 + end], end + 4))
        } else if rest.starts_with('`') {
            rest[1..]
                .find('`')
                .map(|end| (RunKind::Code, &rest[1..1 + end], end + 2))
        } else {
            None
        };

        match matched {
            Some((kind, inner, consumed)) => {
                if plain_start < pos {
                    runs.push(InlineRun::new(RunKind::Plain, &line[plain_start..pos]));
                }
                runs.push(InlineRun::new(kind, inner));
                pos += consumed;
                plain_start = pos;
            }
            None => {
                pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    if plain_start < line.len() {
        runs.push(InlineRun::new(RunKind::Plain, &line[plain_start..]));
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(kind: RunKind, text: &str) -> InlineRun {
        InlineRun::new(kind, text)
    }

    #[test]
    fn plain_line_is_one_run() {
        assert_eq!(
            format_inline("hello world"),
            vec![run(RunKind::Plain, "hello world")]
        );
    }

    #[test]
    fn bold_and_code_are_split_out() {
        assert_eq!(
            format_inline("a **b** c `d` e"),
            vec![
                run(RunKind::Plain, "a "),
                run(RunKind::Bold, "b"),
                run(RunKind::Plain, " c "),
                run(RunKind::Code, "d"),
                run(RunKind::Plain, " e"),
            ]
        );
    }

    #[test]
    fn unmatched_delimiters_stay_plain() {
        assert_eq!(
            format_inline("2 ** 3 and a ` tick"),
            vec![run(RunKind::Plain, "2 ** 3 and a ` tick")]
        );
    }

    #[test]
    fn delimiters_do_not_nest() {
        assert_eq!(
            format_inline("**bold `x` still**"),
            vec![run(RunKind::Bold, "bold `x` still")]
        );
        assert_eq!(
            format_inline("`**not bold**`"),
            vec![run(RunKind::Code, "**not bold**")]
        );
    }

    #[test]
    fn closest_closing_delimiter_wins() {
        assert_eq!(
            format_inline("**a** and **b**"),
            vec![
                run(RunKind::Bold, "a"),
                run(RunKind::Plain, " and "),
                run(RunKind::Bold, "b"),
            ]
        );
    }

    #[test]
    fn multibyte_text_is_preserved() {
        assert_eq!(
            format_inline("字体 **变小** 后"),
            vec![
                run(RunKind::Plain, "字体 "),
                run(RunKind::Bold, "变小"),
                run(RunKind::Plain, " 后"),
            ]
        );
    }

    #[test]
    fn empty_line_has_no_runs() {
        assert!(format_inline("").is_empty());
    }
}
