//! Strict output records.
//!
//! Every field has a defined default: counters are `0`, flags are `false`,
//! strings and identities are `None` (serialized as `null`). A record is
//! always structurally complete even when the source payload was partial.

use serde::Serialize;

use crate::ResourceKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub id: Option<String>,
    pub source_url: String,
    pub kind: ResourceKind,
    pub fields: RecordFields,
    pub fetched_at: String,
}

/// Kind-specific field sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordFields {
    Post(PostFields),
    Profile(ProfileFields),
    Product(ProductFields),
    Listing(ListingFields),
}

impl RecordFields {
    /// Stable identity of the record, when the payload carried one.
    pub fn id(&self) -> Option<String> {
        match self {
            RecordFields::Post(post) => post.video_id.clone(),
            RecordFields::Profile(profile) => profile.user_id.clone(),
            RecordFields::Product(product) => product.product_id.clone(),
            RecordFields::Listing(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFields {
    pub video_id: Option<String>,
    pub description: Option<String>,
    pub create_time: Option<String>,
    pub video: VideoInfo,
    /// `None` when the payload had no author object at all.
    pub author: Option<AuthorInfo>,
    /// `None` when the payload had no music object at all.
    pub music: Option<MusicInfo>,
    pub stats: PostStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub width: u64,
    pub height: u64,
    pub duration: u64,
    pub bitrate: u64,
    pub cover: Option<String>,
    pub play_url: Option<String>,
    pub quality: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInfo {
    pub id: Option<String>,
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub play_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PostStats {
    pub likes: u64,
    pub shares: u64,
    pub comments: u64,
    pub plays: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub user_id: Option<String>,
    pub unique_id: Option<String>,
    pub nickname: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub avatar: AvatarSet,
    pub bio: BioInfo,
    pub account_info: AccountInfo,
    pub stats: ProfileStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AvatarSet {
    pub large: Option<String>,
    pub medium: Option<String>,
    pub thumb: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BioInfo {
    pub signature: Option<String>,
    pub bio_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub created_at: Option<String>,
    pub verified: bool,
    pub region: Option<String>,
    pub private_account: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProfileStats {
    pub followers: u64,
    pub following: u64,
    pub likes: u64,
    pub videos: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFields {
    pub product_id: Option<String>,
    pub title: Option<String>,
    /// Inline description text, or the URL the description is served from.
    pub description: Option<String>,
    pub price: PriceInfo,
    pub rating: RatingInfo,
    pub store: StoreInfo,
    pub shipping: ShippingInfo,
    pub specs: Vec<SpecEntry>,
    pub images: Vec<String>,
    pub sku_options: Vec<SkuOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceInfo {
    /// Defaults to `USD` when the payload does not say.
    pub currency: String,
    pub current: Option<String>,
    pub original: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RatingInfo {
    pub average: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StoreInfo {
    pub name: Option<String>,
    pub url: Option<String>,
    pub since: Option<String>,
    pub rating: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    pub method: Option<String>,
    pub company: Option<String>,
    pub delivery_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecEntry {
    pub name: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkuOption {
    pub name: Option<String>,
    pub values: Vec<SkuValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkuValue {
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ListingFields {
    pub items: Vec<ListingEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingEntry {
    pub product_id: String,
    pub title: Option<String>,
    pub price: Option<String>,
    pub image_url: Option<String>,
    pub orders: u64,
    /// Detail page URL, suitable as a follow-up item target.
    pub item_url: String,
}
