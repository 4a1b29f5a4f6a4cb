use scrape_core::{ErrorKind, ResourceKind, SiteProfile};

#[test]
fn tiktok_urls_are_classified_by_structure() {
    let site = SiteProfile::by_name("TikTok").unwrap();
    let classifier = site.classifier();
    let cases = [
        ("https://vt.tiktok.com/ZSMy827Qe/", ResourceKind::ItemKind),
        (
            "https://www.tiktok.com/@barstoolsports/video/7301234567890",
            ResourceKind::ItemKind,
        ),
        ("https://www.tiktok.com/@barstoolsports", ResourceKind::CollectionKind),
        ("https://m.tiktok.com/@barstoolsports/", ResourceKind::CollectionKind),
        ("https://www.tiktok.com/explore", ResourceKind::UnknownKind),
    ];
    for (url, expected) in cases {
        assert_eq!(classifier.classify(url).unwrap(), expected, "{url}");
    }
}

#[test]
fn aliexpress_urls_are_classified_by_structure() {
    let site = SiteProfile::by_name("aliexpress").unwrap();
    let classifier = site.classifier();
    assert_eq!(
        classifier
            .classify("https://www.aliexpress.com/item/1005001.html")
            .unwrap(),
        ResourceKind::ItemKind
    );
    assert_eq!(
        classifier
            .classify("https://www.aliexpress.com/w/wholesale-smartphone.html")
            .unwrap(),
        ResourceKind::CollectionKind
    );
    let err = classifier
        .classify("https://www.tiktok.com/@someone")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn classify_target_keeps_trimmed_url() {
    let site = SiteProfile::by_name("tiktok").unwrap();
    let target = site
        .classifier()
        .classify_target("  https://www.tiktok.com/@someone  ")
        .unwrap();
    assert_eq!(target.url(), "https://www.tiktok.com/@someone");
    assert_eq!(target.kind(), ResourceKind::CollectionKind);
}

#[test]
fn unknown_site_name_has_no_profile() {
    assert!(SiteProfile::by_name("flipkart").is_none());
    assert_eq!(SiteProfile::builtin_names(), &["tiktok", "aliexpress"]);
}
