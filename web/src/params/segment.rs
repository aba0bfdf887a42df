use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct TranslationsParams {
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
}
