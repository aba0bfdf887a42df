use serde::Deserialize;
use utoipa::IntoParams;

/// Query of `GET /texts`: either one Text by id or the Texts filed under a term.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct IndexParams {
    pub(crate) text_id: Option<String>,
    pub(crate) term_id: Option<String>,
    pub(crate) language: Option<String>,
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
}

/// Language and paging of the per-Text listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct ListingParams {
    pub(crate) language: Option<String>,
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
}

/// Paging of the top-level sections of one table of contents.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct PageParams {
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
}
