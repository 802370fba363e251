use crate::{
    model::RecordModel,
    query::{Connector, Query, QueryItem},
};

///
/// UsageScene
///
/// The operation the decorated query is about to serve.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UsageScene {
    Read,
    Remove,
    Modify,
    Exist,
    Count,
    Max,
    Min,
    Sum,
    Avg,
}

///
/// QuerySource
///
/// How the node being decorated is reached from the root.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuerySource {
    Direct,
    Subquery,
    JoinQuery,
}

///
/// InjectContext
///
/// Read-only view handed to the provider at each visited node.
///

pub struct InjectContext<'a> {
    pub model: Option<&'static RecordModel>,
    pub source: QuerySource,
    pub scene: UsageScene,
    pub query: &'a Query,
}

///
/// GlobalConditionProvider
///
/// External collaborator deciding, per node, whether a mandatory extra
/// condition (tenant scoping, soft-delete exclusion, ...) must be
/// merged before execution.
///

pub trait GlobalConditionProvider {
    fn inject(&self, ctx: InjectContext<'_>) -> Option<(Connector, Query)>;
}

/// Decorate a query tree with global conditions before execution.
///
/// Depth-first: each node is decorated first, then its criteria-value
/// subqueries, then its joined queries, recursing into each in the same
/// order. Deeper nodes therefore observe already-decorated ancestors.
/// A sticky per-node flag guards against re-injection; termination is
/// structural, since the tree is finite and built by value.
pub fn apply_global_conditions(
    query: &mut Query,
    scene: UsageScene,
    provider: &dyn GlobalConditionProvider,
) {
    walk(query, QuerySource::Direct, scene, provider);
}

fn walk(
    query: &mut Query,
    source: QuerySource,
    scene: UsageScene,
    provider: &dyn GlobalConditionProvider,
) {
    if !query.is_globally_filtered() {
        let decision = provider.inject(InjectContext {
            model: query.model(),
            source,
            scene,
            query,
        });
        query.mark_globally_filtered();

        if let Some((connector, extra)) = decision {
            query.add_item_unchecked(connector, QueryItem::Group(Box::new(extra)));
        }
    }

    walk_subqueries(query, scene, provider);

    for join in &mut query.joins {
        walk(&mut join.query, QuerySource::JoinQuery, scene, provider);
    }
}

/// Visit every criteria-value subquery, descending through plain groups.
/// Groups themselves are not injection targets; they share their
/// parent's decoration.
fn walk_subqueries(query: &mut Query, scene: UsageScene, provider: &dyn GlobalConditionProvider) {
    for (_, item) in &mut query.items {
        match item {
            QueryItem::Criteria(criteria) => {
                if let Some(sub) = criteria.subquery_mut() {
                    walk(sub, QuerySource::Subquery, scene, provider);
                }
            }
            QueryItem::Group(group) => walk_subqueries(group, scene, provider),
        }
    }
}
