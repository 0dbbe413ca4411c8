//! Entity extraction output

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One reported entity and the sentence it appeared in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityMention {
    pub text: String,
    pub context: String,
}

/// Category label to mentions, each list ordered by first appearance
pub type EntityExtractionResult = BTreeMap<String, Vec<EntityMention>>;
