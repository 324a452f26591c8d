use css_module_deps::modules_in_order;
use css_module_deps::ordered_chunk_css_modules;
use css_module_deps::ChunkGroup;
use css_module_deps::CssSourceType;
use css_module_deps::OrderConflictWarning;
use css_module_deps::OrderedModule;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Module {
    id: &'static str,
    source_type: CssSourceType,
}

impl Module {
    fn css(id: &'static str) -> Self {
        Self {
            id,
            source_type: CssSourceType::Css,
        }
    }

    fn import(id: &'static str) -> Self {
        Self {
            id,
            source_type: CssSourceType::CssImport,
        }
    }
}

impl OrderedModule for Module {
    fn identifier(&self) -> &str {
        self.id
    }

    fn source_type(&self) -> CssSourceType {
        self.source_type
    }
}

/// A chunk group whose post order is the order of `modules`.
struct Group(Vec<&'static str>);

impl ChunkGroup<Module> for Group {
    fn module_post_order_index(&self, module: &Module) -> Option<u32> {
        self.0
            .iter()
            .position(|id| *id == module.id)
            .map(|index| index as u32)
    }
}

fn ids<'m>(modules: impl IntoIterator<Item = &'m Module>) -> Vec<&'static str> {
    modules.into_iter().map(|module| module.id).collect()
}

#[test]
fn single_group_keeps_post_order() {
    let modules = vec![Module::css("c"), Module::css("a"), Module::css("b")];
    let groups = vec![Group(vec!["a", "b", "c"])];
    let mut warnings = Vec::new();
    let ordered = modules_in_order("main", &groups, &modules, &mut warnings);
    assert_eq!(ids(ordered), vec!["a", "b", "c"]);
    assert!(warnings.is_empty());
}

#[test]
fn consistent_groups_are_merged() {
    let modules = vec![Module::css("a"), Module::css("b"), Module::css("c")];
    let groups = vec![Group(vec!["b", "a"]), Group(vec!["b", "c"])];
    let mut warnings = Vec::new();
    let ordered = modules_in_order("main", &groups, &modules, &mut warnings);
    assert_eq!(ids(ordered), vec!["b", "a", "c"]);
    assert!(warnings.is_empty());
}

#[test]
fn conflicting_groups_warn() {
    let modules = vec![Module::css("A"), Module::css("B")];
    let groups = vec![Group(vec!["A", "B"]), Group(vec!["B", "A"])];
    let mut warnings = Vec::new();
    let ordered = modules_in_order("main", &groups, &modules, &mut warnings);
    assert_eq!(ids(ordered), vec!["A", "B"]);
    assert_eq!(
        warnings,
        vec![OrderConflictWarning {
            chunk: "main".to_string(),
            first: "A".to_string(),
            second: "B".to_string(),
        }]
    );
    assert_eq!(
        warnings[0].to_string(),
        "chunk main\nConflicting order between A and B"
    );
}

#[test]
fn unindexed_modules_come_last() {
    let modules = vec![Module::css("x"), Module::css("a"), Module::css("z")];
    let groups = vec![Group(vec!["z", "a"]), Group(vec![])];
    let mut warnings = Vec::new();
    let ordered = modules_in_order("main", &groups, &modules, &mut warnings);
    assert_eq!(ids(ordered), vec!["z", "a", "x"]);
    assert!(warnings.is_empty());
}

#[test]
fn no_groups_sorts_by_identifier() {
    let modules = vec![Module::css("c"), Module::css("a"), Module::css("b")];
    let groups: Vec<Group> = Vec::new();
    let mut warnings = Vec::new();
    let ordered = modules_in_order("main", &groups, &modules, &mut warnings);
    assert_eq!(ids(ordered), vec!["a", "b", "c"]);
}

#[test]
fn input_order_does_not_matter() {
    let groups = vec![
        Group(vec!["a", "b", "d"]),
        Group(vec!["c", "b"]),
        Group(vec!["d", "e"]),
    ];
    let forward = vec![
        Module::css("a"),
        Module::css("b"),
        Module::css("c"),
        Module::css("d"),
        Module::css("e"),
    ];
    let backward: Vec<Module> = forward.iter().rev().cloned().collect();
    let mut forward_warnings = Vec::new();
    let mut backward_warnings = Vec::new();
    assert_eq!(
        ids(modules_in_order("main", &groups, &forward, &mut forward_warnings)),
        ids(modules_in_order("main", &groups, &backward, &mut backward_warnings)),
    );
    assert_eq!(forward_warnings, backward_warnings);
}

#[test]
fn css_imports_come_first() {
    let modules = vec![Module::css("a"), Module::import("b"), Module::css("c")];
    let groups = vec![Group(vec!["a", "b", "c"])];
    let mut warnings = Vec::new();
    let ordered = ordered_chunk_css_modules("main", &groups, &modules, &mut warnings);
    assert_eq!(ids(ordered), vec!["b", "a", "c"]);
    assert!(warnings.is_empty());
}
