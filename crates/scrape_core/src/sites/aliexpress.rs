use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::path::{count, items, text, text_list};
use crate::{
    CandidateLocator, Classifier, ClassifyRule, KindSchema, ListingEntry, ListingFields,
    MapContext, Normalizer, PriceInfo, ProductFields, RatingInfo, RecordFields, ResourceKind,
    SelectorCandidate, Shape, ShippingInfo, SiteProfile, SkuOption, SkuValue, SpecEntry,
    StoreInfo,
};

pub const NAME: &str = "aliexpress";
const DEFAULT_CURRENCY: &str = "USD";

pub const PRODUCT_SHAPES: [Shape; 1] = [Shape {
    name: "run-params-data",
    root: &["data"],
    required: &[&["titleModule"]],
}];

pub const LISTING_SHAPES: [Shape; 1] = [Shape {
    name: "run-params-item-list",
    root: &["mods", "itemList"],
    required: &[&["content"]],
}];

pub fn profile() -> SiteProfile {
    profile_with_max_items(None)
}

/// Same as [`profile`], keeping at most `max_items` listing entries.
pub fn profile_with_max_items(max_items: Option<usize>) -> SiteProfile {
    let classifier = Classifier::new(["aliexpress.com"])
        .with_rule(ClassifyRule::segment("item", ResourceKind::ItemKind))
        .with_rule(ClassifyRule::first_segment("w", ResourceKind::CollectionKind));

    let locator = CandidateLocator::new(vec![SelectorCandidate::global("runParams")]);

    let normalizer = Normalizer::new()
        .with_schema(KindSchema::new(
            ResourceKind::ItemKind,
            PRODUCT_SHAPES.to_vec(),
            map_product,
        ))
        .with_schema(KindSchema::new(
            ResourceKind::CollectionKind,
            LISTING_SHAPES.to_vec(),
            move |list: &Value, ctx: &MapContext<'_>| map_listing(list, ctx, max_items),
        ));

    SiteProfile::new(NAME, classifier, locator, normalizer)
        .with_referer("https://www.aliexpress.com/")
}

pub fn item_url(product_id: &str) -> String {
    format!("https://www.aliexpress.com/item/{product_id}.html")
}

fn product_id_from_url(url: &str) -> Option<String> {
    static ITEM_PATH: OnceLock<Option<Regex>> = OnceLock::new();
    ITEM_PATH
        .get_or_init(|| Regex::new(r"/item/(\d+)\.html").ok())
        .as_ref()?
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// `data` is the `runParams.data` object.
pub fn map_product(data: &Value, ctx: &MapContext<'_>) -> RecordFields {
    let specs = items(data, &["specsModule", "props"])
        .iter()
        .map(|spec| SpecEntry {
            name: text(spec, &["attrName"]),
            value: text(spec, &["attrValue"]),
        })
        .collect();

    let sku_options = items(data, &["skuModule", "productSKUPropertyList"])
        .iter()
        .map(|prop| SkuOption {
            name: text(prop, &["skuPropertyName"]),
            values: items(prop, &["skuPropertyValues"])
                .iter()
                .map(|value| SkuValue {
                    name: text(value, &["propertyValueDisplayName"]),
                    image: text(value, &["skuPropertyImagePath"]),
                })
                .collect(),
        })
        .collect();

    RecordFields::Product(ProductFields {
        product_id: text(data, &["actionModule", "productId"])
            .or_else(|| product_id_from_url(ctx.source_url)),
        title: text(data, &["titleModule", "subject"]),
        description: text(data, &["productDescComponent"])
            .or_else(|| text(data, &["productDescComponent", "descriptionUrl"])),
        price: PriceInfo {
            currency: text(data, &["currencyCode"]).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            current: text(data, &["priceModule", "formatedPrice"]),
            original: text(data, &["priceModule", "formatedActivityPrice"]),
        },
        rating: RatingInfo {
            average: text(data, &["titleModule", "feedbackRating", "averageStar"]),
            count: count(data, &["titleModule", "feedbackRating", "totalValidNum"]),
        },
        store: StoreInfo {
            name: text(data, &["storeModule", "storeName"]),
            url: text(data, &["storeModule", "storeURL"]),
            since: text(data, &["storeModule", "openTime"]),
            rating: text(data, &["storeModule", "positiveRate"]),
        },
        shipping: ShippingInfo {
            method: text(data, &["shippingModule", "shipFrom"]),
            company: text(data, &["shippingModule", "company"]),
            delivery_date: text(data, &["shippingModule", "deliveryDate"]),
        },
        specs,
        images: text_list(data, &["imageModule", "imagePathList"]),
        sku_options,
    })
}

/// `list` is the `runParams.mods.itemList` object.
pub fn map_listing(list: &Value, _ctx: &MapContext<'_>, max_items: Option<usize>) -> RecordFields {
    let entries = items(list, &["content"])
        .iter()
        .filter_map(|product| {
            let product_id = text(product, &["productId"])?;
            Some(ListingEntry {
                item_url: item_url(&product_id),
                title: text(product, &["title"]),
                price: text(product, &["price"]),
                image_url: text(product, &["image"]),
                orders: count(product, &["orders"]),
                product_id,
            })
        })
        .take(max_items.unwrap_or(usize::MAX))
        .collect();

    RecordFields::Listing(ListingFields { items: entries })
}
