//! Multi-frame verdicts for video and live sessions.

mod aggregator;

pub use aggregator::{
    AggregateVerdict, AggregationSession, TemporalAggregator, VoteCounts, REASON_EMPTY,
    REASON_MAJORITY_CALM, REASON_NO_SUBJECT, REASON_TIE_CALM, REASON_TIE_CONFIDENCE,
    REASON_TIE_SCORE,
};
