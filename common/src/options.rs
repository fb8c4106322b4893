//! Pipeline options shared by preview and generation

use crate::alias::HeaderAliases;
use crate::assign::RotationScope;
use crate::render::PlaceholderStyle;
use serde::{Deserialize, Serialize};

/// Everything besides rows/templates/overrides that shapes a pass.
///
/// Preview and generation must be handed the same options, or they will
/// disagree about assignments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineOptions {
    #[serde(default)]
    pub aliases: HeaderAliases,
    #[serde(default)]
    pub placeholder_style: PlaceholderStyle,
    #[serde(default)]
    pub rotation: RotationScope,
}
