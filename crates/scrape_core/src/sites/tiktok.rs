use serde_json::Value;

use crate::path::{count, epoch_to_iso, flag, lookup, text};
use crate::{
    AccountInfo, AuthorInfo, AvatarSet, BioInfo, CandidateLocator, Classifier, ClassifyRule,
    KindSchema, MapContext, MusicInfo, Normalizer, PostFields, PostStats, ProfileFields,
    ProfileStats, RecordFields, ResourceKind, SelectorCandidate, Shape, SiteProfile, VideoInfo,
};

pub const NAME: &str = "tiktok";
pub const SHORT_LINK_HOST: &str = "vt.tiktok.com";

pub const POST_SHAPES: [Shape; 2] = [
    Shape {
        name: "video-detail",
        root: &["__DEFAULT_SCOPE__", "webapp.video-detail", "itemInfo", "itemStruct"],
        required: &[&["video"]],
    },
    Shape {
        name: "reflow-video-detail",
        root: &[
            "__DEFAULT_SCOPE__",
            "webapp.reflow.video.detail",
            "itemInfo",
            "itemStruct",
        ],
        required: &[&["video"]],
    },
];

pub const PROFILE_SHAPES: [Shape; 1] = [Shape {
    name: "user-detail",
    root: &["__DEFAULT_SCOPE__", "webapp.user-detail"],
    required: &[&["userInfo", "user"]],
}];

pub fn profile() -> SiteProfile {
    let classifier = Classifier::new(["tiktok.com"])
        .with_short_link_host(SHORT_LINK_HOST)
        .with_rule(ClassifyRule::ShortLinkHost(ResourceKind::ItemKind))
        .with_rule(ClassifyRule::segment("video", ResourceKind::ItemKind))
        .with_rule(ClassifyRule::first_segment_prefix(
            "@",
            ResourceKind::CollectionKind,
        ));

    let locator = CandidateLocator::new(vec![SelectorCandidate::css(
        "script#__UNIVERSAL_DATA_FOR_REHYDRATION__",
    )]);

    let normalizer = Normalizer::new()
        .with_schema(KindSchema::new(
            ResourceKind::ItemKind,
            POST_SHAPES.to_vec(),
            map_post,
        ))
        .with_schema(KindSchema::new(
            ResourceKind::CollectionKind,
            PROFILE_SHAPES.to_vec(),
            map_profile,
        ));

    SiteProfile::new(NAME, classifier, locator, normalizer).with_referer("https://www.tiktok.com/")
}

/// `item` is the `itemStruct` object.
pub fn map_post(item: &Value, _ctx: &MapContext<'_>) -> RecordFields {
    let author = lookup(item, &["author"]).map(|author| AuthorInfo {
        id: text(author, &["id"]),
        username: text(author, &["uniqueId"]),
        nickname: text(author, &["nickname"]),
        verified: flag(author, &["verified"]),
    });
    let music = lookup(item, &["music"]).map(|music| MusicInfo {
        id: text(music, &["id"]),
        title: text(music, &["title"]),
        play_url: text(music, &["playUrl"]),
    });

    RecordFields::Post(PostFields {
        video_id: text(item, &["id"]),
        description: text(item, &["desc"]),
        create_time: epoch_to_iso(item, &["createTime"]),
        video: VideoInfo {
            width: count(item, &["video", "width"]),
            height: count(item, &["video", "height"]),
            duration: count(item, &["video", "duration"]),
            bitrate: count(item, &["video", "bitrate"]),
            cover: text(item, &["video", "cover"]),
            play_url: text(item, &["video", "playAddr"]),
            quality: text(item, &["video", "videoQuality"]),
            format: text(item, &["video", "format"]),
        },
        author,
        music,
        stats: PostStats {
            likes: count(item, &["stats", "diggCount"]),
            shares: count(item, &["stats", "shareCount"]),
            comments: count(item, &["stats", "commentCount"]),
            plays: count(item, &["stats", "playCount"]),
        },
    })
}

/// `detail` is the `webapp.user-detail` object.
pub fn map_profile(detail: &Value, _ctx: &MapContext<'_>) -> RecordFields {
    let user = lookup(detail, &["userInfo", "user"]).unwrap_or(&Value::Null);
    let stats = lookup(detail, &["userInfo", "stats"]).unwrap_or(&Value::Null);

    RecordFields::Profile(ProfileFields {
        user_id: text(user, &["id"]),
        unique_id: text(user, &["uniqueId"]),
        nickname: text(user, &["nickname"]),
        title: text(detail, &["shareMeta", "title"]),
        description: text(detail, &["shareMeta", "desc"]),
        avatar: AvatarSet {
            large: text(user, &["avatarLarger"]),
            medium: text(user, &["avatarMedium"]),
            thumb: text(user, &["avatarThumb"]),
        },
        bio: BioInfo {
            signature: text(user, &["signature"]),
            bio_link: text(user, &["bioLink", "link"]),
        },
        account_info: AccountInfo {
            created_at: epoch_to_iso(user, &["createTime"]),
            verified: flag(user, &["verified"]),
            region: text(user, &["region"]),
            private_account: flag(user, &["privateAccount"]),
        },
        stats: ProfileStats {
            followers: count(stats, &["followerCount"]),
            following: count(stats, &["followingCount"]),
            likes: count(stats, &["heartCount"]),
            videos: count(stats, &["videoCount"]),
        },
    })
}
