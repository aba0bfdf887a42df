use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct IndexParams {
    /// Lists the children of this term; the top level when absent
    pub(crate) parent_id: Option<String>,
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
}
