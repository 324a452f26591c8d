use css_module_deps::collect_dependencies;
use css_module_deps::comments_in_range;
use css_module_deps::escape_identifier;
use css_module_deps::modules_in_order;
use css_module_deps::unescape_identifier;
use css_module_deps::ChunkGroup;
use css_module_deps::Comment;
use css_module_deps::CssMode;
use css_module_deps::Lexer;
use css_module_deps::LocConverter;
use css_module_deps::OrderedModule;
use css_module_deps::Pos;
use css_module_deps::Range;
use css_module_deps::SourcePosition;
use css_module_deps::SourceSpan;
use css_module_deps::Visitor;
use proptest::prelude::*;

const CSS_ALPHABET: &str = r#"[a-z0-9 .:#@{}();,'"/*\\\n%!-]{0,96}"#;

#[derive(Default)]
struct Tokens {
    ranges: Vec<(Pos, Pos)>,
}

impl Tokens {
    fn push(&mut self, start: Pos, end: Pos) -> Option<()> {
        self.ranges.push((start, end));
        Some(())
    }
}

impl Visitor<'_> for Tokens {
    fn is_selector(&mut self, _: &Lexer) -> bool {
        true
    }

    fn white_space(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn comment(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn string(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn url(&mut self, _: &mut Lexer, start: Pos, end: Pos, _: Pos, _: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn bad_url(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn ident(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn function(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn pseudo_function(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn pseudo_class(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn at_keyword(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn class(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn id(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn numeric(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn delim(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn left_parenthesis(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn right_parenthesis(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn left_curly_bracket(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn right_curly_bracket(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn semicolon(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }

    fn comma(&mut self, _: &mut Lexer, start: Pos, end: Pos) -> Option<()> {
        self.push(start, end)
    }
}

fn brute_force_position(input: &str, pos: usize) -> SourcePosition {
    let before = &input[..pos];
    let line = before.matches('\n').count() as u32 + 1;
    let column = before.rfind('\n').map_or(pos, |i| pos - i - 1) as u32;
    SourcePosition::new(line, column)
}

struct Module(String);

impl OrderedModule for Module {
    fn identifier(&self) -> &str {
        &self.0
    }
}

struct Group(Vec<usize>);

impl ChunkGroup<Module> for Group {
    fn module_post_order_index(&self, module: &Module) -> Option<u32> {
        let id: usize = module.0[1..].parse().ok()?;
        self.0.iter().position(|m| *m == id).map(|i| i as u32)
    }
}

fn groups_strategy() -> impl Strategy<Value = (usize, Vec<Vec<usize>>)> {
    (1usize..8).prop_flat_map(|count| {
        let group = Just((0..count).collect::<Vec<_>>())
            .prop_shuffle()
            .prop_flat_map(move |order| (0..=count).prop_map(move |len| order[..len].to_vec()));
        (Just(count), prop::collection::vec(group, 0..4))
    })
}

proptest! {
    #[test]
    fn tokens_cover_the_input(input in CSS_ALPHABET) {
        let mut tokens = Tokens::default();
        let mut lexer = Lexer::new(&input);
        lexer.lex(&mut tokens);
        prop_assert!(lexer.is_eof());
        let mut expected_start = 0;
        for (start, end) in tokens.ranges {
            prop_assert_eq!(start, expected_start);
            prop_assert!(end > start);
            expected_start = end;
        }
        prop_assert_eq!(expected_start as usize, input.len());
    }

    #[test]
    fn dependency_ranges_are_in_bounds(input in CSS_ALPHABET) {
        for mode in [CssMode::Pure, CssMode::Global, CssMode::Local] {
            let (dependencies, warnings) = collect_dependencies(&input, mode).unwrap();
            for range in dependencies.iter().filter_map(|d| d.range()) {
                prop_assert!(range.start <= range.end);
                prop_assert!(input.get(range.start as usize..range.end as usize).is_some());
            }
            for warning in warnings {
                prop_assert!(warning.range().start <= warning.range().end);
                prop_assert!(warning.range().end as usize <= input.len());
            }
        }
    }

    #[test]
    fn loc_converter_matches_line_counting(
        input in "[a-c\n]{0,64}",
        positions in prop::collection::vec(0usize..64, 1..16),
    ) {
        let mut loc = LocConverter::new(&input);
        for pos in positions {
            let pos = pos.min(input.len());
            prop_assert_eq!(loc.get(pos as Pos), brute_force_position(&input, pos));
        }
    }

    #[test]
    fn escape_then_unescape(input in "\\PC{0,24}") {
        let escaped = escape_identifier(&input);
        prop_assert_eq!(unescape_identifier(&escaped), input.as_str());
    }

    #[test]
    fn escaped_text_is_one_identifier(input in "[^\\x00]{1,24}") {
        let escaped = escape_identifier(&input);
        let mut lexer = Lexer::new(&escaped);
        prop_assert_eq!(lexer.eat_ident_sequence(), Some(Range::new(0, escaped.len() as Pos)));
        prop_assert!(lexer.is_eof());
        prop_assert_eq!(unescape_identifier(&escaped), input.as_str());
    }

    #[test]
    fn comments_in_range_matches_filter(
        spans in prop::collection::vec((0u32..4, 2u32..6), 0..12),
        start in 0u32..64,
        len in 0u32..64,
    ) {
        let mut comments = Vec::new();
        let mut pos = 0;
        for (gap, size) in spans {
            let range = Range::new(pos + gap, pos + gap + size);
            pos = range.end;
            comments.push(Comment {
                value: "",
                range,
                loc: SourceSpan::default(),
            });
        }
        let range = Range::new(start, start + len);
        let found: Vec<Range> = comments_in_range(&comments, range).map(|c| c.range).collect();
        let expected: Vec<Range> = comments
            .iter()
            .filter(|c| c.range.start >= range.start && c.range.end <= range.end)
            .map(|c| c.range)
            .collect();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn module_order_is_a_deterministic_permutation(
        (count, groups) in groups_strategy(),
        seed in any::<u64>(),
    ) {
        let groups: Vec<Group> = groups.into_iter().map(Group).collect();
        let modules: Vec<Module> = (0..count).map(|i| Module(format!("m{i}"))).collect();
        let mut shuffled: Vec<Module> = (0..count).map(|i| Module(format!("m{i}"))).collect();
        shuffled.rotate_left((seed as usize) % count);

        let mut warnings = Vec::new();
        let ordered: Vec<&str> = modules_in_order("main", &groups, &modules, &mut warnings)
            .into_iter()
            .map(|m| m.0.as_str())
            .collect();
        let mut shuffled_warnings = Vec::new();
        let shuffled_ordered: Vec<&str> =
            modules_in_order("main", &groups, &shuffled, &mut shuffled_warnings)
                .into_iter()
                .map(|m| m.0.as_str())
                .collect();

        prop_assert_eq!(&ordered, &shuffled_ordered);
        prop_assert_eq!(warnings, shuffled_warnings);
        prop_assert_eq!(ordered.len(), count);
        let mut sorted = ordered.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), count);
    }
}
