//! Core types for CIMLens: result records, the rating/confidence scale codec,
//! and defensive rendering of analysis documents.

pub mod analysis;
pub mod record;
pub mod scale;
pub mod upload;

pub use analysis::{AnalysisSections, AnalysisView, Entries, SummaryDocument, card_title, render};
pub use record::{AnalysisResult, ResultId, Timestamp, sort_recent_first};
pub use scale::{
    ConfidenceDisplay, Rating, RatingToken, confidence_to_percent, percent_to_confidence,
    rating_to_token, token_to_rating,
};
pub use upload::{UploadRejected, check_upload};
