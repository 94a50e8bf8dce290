//! Scene aggression scoring from object detections.

mod engine;

pub use engine::{
    SceneAggressionScorer, SceneScore, SceneScorer, REASON_BITING, REASON_CALM, REASON_CHASING, REASON_FLEEING,
    REASON_MULTIPLE, REASON_NO_OBJECTS,
};
