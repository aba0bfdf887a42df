pub(crate) mod collection_controller;
pub(crate) mod group_controller;
pub(crate) mod health_check_controller;
pub(crate) mod mapping_controller;
pub(crate) mod segment_controller;
pub(crate) mod term_controller;
pub(crate) mod text_controller;
