//! Scrape core: pure classification, payload location and normalization.
mod classify;
mod locate;
mod normalize;
mod outcome;
pub mod path;
mod records;
pub mod sites;
mod types;

pub use classify::{ClassifyRule, Classifier};
pub use locate::{
    diagnostic_snippet, find_global_assignment, locate, rewrite_undefined, CandidateLocator,
    Locator, SelectorCandidate, DEFAULT_SNIPPET_LEN,
};
pub use normalize::{FieldMapper, KindSchema, MapContext, Normalizer, Shape};
pub use outcome::{BatchOutcome, BatchReport, BatchSummary, FailureRecord, FetchDiagnostics};
pub use records::{
    AccountInfo, AuthorInfo, AvatarSet, BioInfo, ListingEntry, ListingFields, MusicInfo,
    NormalizedRecord, PostFields, PostStats, PriceInfo, ProductFields, ProfileFields,
    ProfileStats, RatingInfo, RecordFields, ShippingInfo, SkuOption, SkuValue, SpecEntry,
    StoreInfo, VideoInfo,
};
pub use sites::SiteProfile;
pub use types::{
    ErrorKind, ExtractedPayload, ExtractionContext, ExtractionError, ResourceKind, Target,
};
