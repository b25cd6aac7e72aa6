use std::collections::BTreeSet;

use super::catalog::Catalog;
use super::parameters::{ParameterId, PricingParameter};

/// Parameters worth collecting for the given task selection, in catalog order.
///
/// `complexity` is always included. Unknown task ids contribute nothing.
pub(crate) fn applicable_parameters<'c, T>(
    catalog: &'c Catalog,
    task_ids: &[T],
) -> Vec<&'c PricingParameter>
where
    T: AsRef<str>,
{
    let mut wanted = BTreeSet::from([ParameterId::Complexity]);

    for task in task_ids.iter().filter_map(|id| catalog.task(id.as_ref())) {
        wanted.extend(task.category.pricing_parameters().iter().copied());
    }

    catalog
        .parameters()
        .iter()
        .filter(|parameter| wanted.contains(&parameter.id()))
        .collect()
}
