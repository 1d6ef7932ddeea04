use proptest::prelude::*;

use snapcard::{
    Block, BlockKind, CanvasSize, HeightMap, Page, Theme, paginate, parse_blocks, safe_height,
};

fn line() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z ]{1,20}",
        "# [a-z]{1,8}",
        "## [a-z]{1,8}",
        "- [a-z]{1,8}",
        "\\* [a-z]{1,8}",
        "[1-9]\\. [a-z]{1,8}",
        "> [a-z]{1,8}",
        "\\| [a-z]{1,4} \\| [a-z]{1,4} \\|",
        Just("---".to_string()),
        Just("```".to_string()),
        Just("```rust".to_string()),
        Just("  ```".to_string()),
        Just(String::new()),
        Just("   ".to_string()),
    ]
}

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(line(), 0..40).prop_map(|lines| lines.join("\n"))
}

/// Lines that should survive parsing: everything inside a fence, and outside
/// fences every line that is not blank, a fence marker or a `---` rule.
fn content_lines(text: &str) -> Vec<&str> {
    let mut in_code = false;
    let mut kept = Vec::new();
    for line in text.split('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_code = !in_code;
        } else if in_code || (!trimmed.is_empty() && trimmed != "---") {
            kept.push(line);
        }
    }
    kept
}

fn blocks_with(heights: &[f32]) -> (Vec<Block>, HeightMap) {
    let text = (0..heights.len())
        .map(|i| format!("p{i}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    let blocks = parse_blocks(&text);
    let map = blocks.iter().zip(heights).map(|(b, h)| (b.id, *h)).collect();
    (blocks, map)
}

fn page_height(page: &Page, blocks: &[Block], heights: &HeightMap) -> f32 {
    page.blocks(blocks).iter().map(|b| heights.get(b.id)).sum()
}

proptest! {
    #[test]
    fn parsing_keeps_every_content_line(text in document()) {
        let expected = content_lines(&text);
        let blocks = parse_blocks(&text);
        let actual: Vec<&str> = blocks
            .iter()
            .filter(|b| b.kind != BlockKind::Separator)
            .flat_map(|b| b.content.iter().map(String::as_str))
            .collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn fenced_lines_become_code_verbatim(
        before in document(),
        body in prop::collection::vec(line(), 0..10),
    ) {
        let body: Vec<String> = body.into_iter().filter(|l| !l.trim().starts_with("```")).collect();
        let text = format!("{before}\n\n```\n{}\n```", body.join("\n"));
        let blocks = parse_blocks(&text);
        let fence_count = text.lines().filter(|l| l.trim().starts_with("```")).count();
        // the appended fence pair only closes cleanly when `before` left no fence open
        if fence_count % 2 == 0 {
            let last = blocks.last().unwrap();
            prop_assert_eq!(last.kind, BlockKind::Code);
            let expected = if body.is_empty() { vec![String::new()] } else { body.clone() };
            prop_assert_eq!(&last.content, &expected);
        }
    }

    #[test]
    fn parsing_is_deterministic(text in document()) {
        let first = parse_blocks(&text);
        let second = parse_blocks(&text);
        prop_assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            prop_assert!(a.same_content(b));
            prop_assert_ne!(a.id, b.id);
        }
    }

    #[test]
    fn pages_cover_blocks_in_order(
        heights in prop::collection::vec(0.0f32..400.0, 0..30),
        safe in 50.0f32..400.0,
    ) {
        let (blocks, map) = blocks_with(&heights);
        let pages = paginate(&blocks, &map, Some(safe));
        prop_assert!(!pages.is_empty());

        let mut next = 0;
        for page in &pages {
            prop_assert_eq!(page.range().start, next);
            if !blocks.is_empty() {
                prop_assert!(!page.is_empty());
            }
            next = page.range().end;
        }
        prop_assert_eq!(next, blocks.len());
    }

    #[test]
    fn shared_pages_fit_and_oversized_blocks_stand_alone(
        heights in prop::collection::vec(0.0f32..400.0, 1..30),
        safe in 50.0f32..400.0,
    ) {
        let (blocks, map) = blocks_with(&heights);
        let pages = paginate(&blocks, &map, Some(safe));
        for page in &pages {
            if page.len() > 1 {
                prop_assert!(page_height(page, &blocks, &map) <= safe);
            }
            for block in page.blocks(&blocks) {
                if map.get(block.id) > safe {
                    prop_assert_eq!(page.len(), 1);
                }
            }
        }
    }

    #[test]
    fn a_page_only_closes_when_the_next_block_would_overflow(
        heights in prop::collection::vec(0.0f32..400.0, 1..30),
        safe in 50.0f32..400.0,
    ) {
        let (blocks, map) = blocks_with(&heights);
        let pages = paginate(&blocks, &map, Some(safe));
        for pair in pages.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let next_height = map.get(blocks[next.range().start].id);
            let current_oversized = current.len() == 1
                && map.get(blocks[current.range().start].id) > safe;
            if next_height <= safe && !current_oversized {
                prop_assert!(page_height(current, &blocks, &map) + next_height > safe);
            }
        }
    }

    #[test]
    fn unbounded_canvas_is_a_single_page(
        heights in prop::collection::vec(0.0f32..5000.0, 0..30),
    ) {
        let (blocks, map) = blocks_with(&heights);
        let pages = paginate(&blocks, &map, None);
        prop_assert_eq!(pages.len(), 1);
        prop_assert_eq!(pages[0].range(), 0..blocks.len());
    }

    #[test]
    fn safe_height_deducts_padding_and_footer(
        width in 100.0f32..2000.0,
        height in 100.0f32..2000.0,
        theme_index in 0usize..5,
    ) {
        let name = Theme::list_builtins()[theme_index];
        let theme = Theme::from_builtin(name).unwrap();
        let canvas = CanvasSize::fixed(width, height);
        prop_assert_eq!(
            safe_height(&canvas, &theme),
            Some(height - theme.padding * 2.0 - 60.0)
        );
        prop_assert_eq!(safe_height(&CanvasSize::auto(width), &theme), None);
    }
}
