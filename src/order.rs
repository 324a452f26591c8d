use std::cmp::Ordering;
use std::fmt::Display;

use rustc_hash::FxHashSet;

/// Which output partition a CSS module belongs to.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CssSourceType {
    /// A module that is only a CSS `@import` of another CSS file.
    CssImport,
    #[default]
    Css,
}

pub trait OrderedModule {
    /// Unique and stable, used to break ties.
    fn identifier(&self) -> &str;

    fn readable_identifier(&self) -> &str {
        self.identifier()
    }

    fn source_type(&self) -> CssSourceType {
        CssSourceType::Css
    }
}

pub trait ChunkGroup<M> {
    /// Position of `module` in a post-order walk of the group, `None` if the group
    /// doesn't contain it.
    fn module_post_order_index(&self, module: &M) -> Option<u32>;
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct OrderConflictWarning {
    pub chunk: String,
    pub first: String,
    pub second: String,
}

impl Display for OrderConflictWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "chunk {}\nConflicting order between {} and {}",
            self.chunk, self.first, self.second
        )
    }
}

/// Modules of one group, by descending post order index. The tail is the next module
/// the group wants to see.
#[derive(Debug)]
struct GroupList {
    list: Vec<usize>,
    set: FxHashSet<usize>,
}

fn compare_group_lists(a: &GroupList, b: &GroupList) -> Ordering {
    match (a.list.last(), b.list.last()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

/// Merges the module orders of all chunk groups into one order. Conflicting orders are
/// resolved by a deterministic choice and reported in `warnings`. Modules that no group
/// contains come last, by identifier.
pub fn modules_in_order<'m, M, G>(
    chunk: &str,
    groups: &[G],
    modules: &'m [M],
    warnings: &mut Vec<OrderConflictWarning>,
) -> Vec<&'m M>
where
    M: OrderedModule,
    G: ChunkGroup<M>,
{
    // Indexes into `sorted` compare like identifiers.
    let mut sorted: Vec<&'m M> = modules.iter().collect();
    sorted.sort_by(|a, b| a.identifier().cmp(b.identifier()));

    let mut lists: Vec<GroupList> = groups
        .iter()
        .map(|group| {
            let mut indexed: Vec<(u32, usize)> = sorted
                .iter()
                .enumerate()
                .filter_map(|(i, module)| group.module_post_order_index(module).map(|index| (index, i)))
                .collect();
            indexed.sort_by(|a, b| b.0.cmp(&a.0));
            let list: Vec<usize> = indexed.into_iter().map(|(_, i)| i).collect();
            let set = list.iter().copied().collect();
            GroupList { list, set }
        })
        .filter(|group| !group.list.is_empty())
        .collect();

    let mut order = Vec::with_capacity(sorted.len());
    if lists.len() == 1 {
        order.extend(lists[0].list.iter().rev().copied());
    } else {
        lists.sort_by(compare_group_lists);
        while let Some(&first) = lists.first().and_then(|group| group.list.last()) {
            let mut selected = first;
            let mut failed_modules = FxHashSet::default();
            let mut has_failed = None;
            'outer: loop {
                for group in &lists {
                    let Some(&last) = group.list.last() else {
                        continue;
                    };
                    if last == selected || !group.set.contains(&selected) {
                        continue;
                    }
                    failed_modules.insert(selected);
                    if failed_modules.contains(&last) {
                        // a cycle, try the other groups before giving up
                        has_failed = Some(last);
                        continue;
                    }
                    selected = last;
                    has_failed = None;
                    continue 'outer;
                }
                break;
            }
            if let Some(failed) = has_failed {
                let warning = OrderConflictWarning {
                    chunk: chunk.to_string(),
                    first: sorted[failed].readable_identifier().to_string(),
                    second: sorted[selected].readable_identifier().to_string(),
                };
                tracing::debug!(
                    chunk,
                    winner = warning.first.as_str(),
                    loser = warning.second.as_str(),
                    "resolved conflicting css order"
                );
                warnings.push(warning);
                selected = failed;
            }
            order.push(selected);
            for group in &mut lists {
                if group.list.last() == Some(&selected) {
                    group.list.pop();
                    group.set.remove(&selected);
                } else if has_failed.is_some() && group.set.remove(&selected) {
                    if let Some(position) = group.list.iter().position(|&i| i == selected) {
                        group.list.remove(position);
                    }
                }
            }
            lists.sort_by(compare_group_lists);
        }
    }

    let mut emitted = vec![false; sorted.len()];
    for &i in &order {
        emitted[i] = true;
    }
    order.extend((0..sorted.len()).filter(|&i| !emitted[i]));
    order.into_iter().map(|i| sorted[i]).collect()
}

/// The final order of a chunk's CSS: modules that are plain CSS imports first, then the
/// rest, each part ordered by [`modules_in_order`].
pub fn ordered_chunk_css_modules<'m, M, G>(
    chunk: &str,
    groups: &[G],
    modules: &'m [M],
    warnings: &mut Vec<OrderConflictWarning>,
) -> Vec<&'m M>
where
    M: OrderedModule,
    G: ChunkGroup<M>,
{
    let (imports, rest): (Vec<&'m M>, Vec<&'m M>) = modules
        .iter()
        .partition(|module| module.source_type() == CssSourceType::CssImport);
    let mut ordered = partition_in_order(chunk, groups, &imports, warnings);
    ordered.extend(partition_in_order(chunk, groups, &rest, warnings));
    ordered
}

fn partition_in_order<'m, M, G>(
    chunk: &str,
    groups: &[G],
    modules: &[&'m M],
    warnings: &mut Vec<OrderConflictWarning>,
) -> Vec<&'m M>
where
    M: OrderedModule,
    G: ChunkGroup<M>,
{
    let groups: Vec<ByRef<'_, G>> = groups.iter().map(ByRef).collect();
    modules_in_order(chunk, &groups, modules, warnings)
        .into_iter()
        .copied()
        .collect()
}

struct ByRef<'g, G>(&'g G);

impl<M, G: ChunkGroup<M>> ChunkGroup<&M> for ByRef<'_, G> {
    fn module_post_order_index(&self, module: &&M) -> Option<u32> {
        self.0.module_post_order_index(module)
    }
}

impl<M: OrderedModule> OrderedModule for &M {
    fn identifier(&self) -> &str {
        (**self).identifier()
    }

    fn readable_identifier(&self) -> &str {
        (**self).readable_identifier()
    }

    fn source_type(&self) -> CssSourceType {
        (**self).source_type()
    }
}
