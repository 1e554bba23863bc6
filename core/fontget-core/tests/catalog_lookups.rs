use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::{json, Value};

use fontget_core::error::CatalogError;
use fontget_core::manifest::source_info;
use fontget_core::model::{FontManifest, RawSourceDataset, SourceDescriptor};
use fontget_core::repository::{FontResolution, Repository};
use fontget_core::score::{MatchType, RankingPolicy};

fn descriptor(name: &str, prefix: &str, priority: u32) -> SourceDescriptor {
    SourceDescriptor {
        name: name.to_string(),
        url: format!("https://sources.test/{prefix}.json"),
        prefix: prefix.to_string(),
        enabled: true,
        priority,
    }
}

fn dataset(name: &str, fonts: &[(&str, &str)]) -> RawSourceDataset {
    let fonts: serde_json::Map<String, Value> = fonts
        .iter()
        .map(|(key, font_name)| {
            let font = json!({
                "name": font_name,
                "license": "OFL",
                "categories": ["Monospace"],
                "variants": []
            });
            (key.to_string(), font)
        })
        .collect();
    serde_json::from_value(json!({
        "source_info": { "name": name, "last_updated": "2024-03-01T00:00:00Z" },
        "fonts": fonts
    }))
    .expect("dataset")
}

fn repository(parts: &[(SourceDescriptor, &[(&str, &str)])]) -> Repository {
    let mut sources = BTreeMap::new();
    for (descriptor, fonts) in parts {
        let data = dataset(&descriptor.name, fonts);
        sources.insert(descriptor.name.clone(), source_info(descriptor, &data));
    }
    let manifest = FontManifest {
        version: "1.0".to_string(),
        last_updated: Utc::now(),
        sources,
    };
    let descriptors: Vec<SourceDescriptor> = parts.iter().map(|(d, _)| d.clone()).collect();
    Repository::new(manifest, &descriptors, RankingPolicy::default())
}

const GOOGLE: &[(&str, &str)] = &[
    ("jetbrains-mono", "JetBrains Mono"),
    ("roboto", "Roboto"),
    ("fira-code", "Fira Code"),
];
const NERD: &[(&str, &str)] = &[
    ("jetbrains-mono", "JetBrainsMono Nerd Font"),
    ("fira-code", "FiraCode Nerd Font"),
    ("hack", "Hack Nerd Font"),
];
const SQUIRREL: &[(&str, &str)] = &[("roboto", "Roboto")];

fn catalog() -> Repository {
    repository(&[
        (descriptor("Google Fonts", "google", 1), GOOGLE),
        (descriptor("Nerd Fonts", "nerd", 2), NERD),
        (descriptor("Font Squirrel", "squirrel", 3), SQUIRREL),
    ])
}

fn matched_id(repo: &Repository, family: &str) -> Option<String> {
    repo.match_installed_font(family).map(|m| m.font_id)
}

#[test]
fn plain_family_matches_by_name_in_priority_order() {
    let repo = catalog();
    assert_eq!(matched_id(&repo, "JetBrains Mono").as_deref(), Some("google.jetbrains-mono"));
    assert_eq!(matched_id(&repo, "roboto").as_deref(), Some("google.roboto"));
    assert_eq!(matched_id(&repo, "Fira-Code").as_deref(), Some("google.fira-code"));
}

#[test]
fn nerd_font_families_resolve_to_the_nerd_source() {
    let repo = catalog();
    assert_eq!(
        matched_id(&repo, "JetBrainsMono Nerd Font").as_deref(),
        Some("nerd.jetbrains-mono")
    );
    assert_eq!(
        matched_id(&repo, "JetBrainsMonoNL Nerd Font Mono").as_deref(),
        Some("nerd.jetbrains-mono")
    );
    assert_eq!(matched_id(&repo, "Hack Nerd Font Propo").as_deref(), Some("nerd.hack"));

    let hit = repo.match_installed_font("FiraCode Nerd Font").expect("match");
    assert_eq!(hit.source, "Nerd Fonts");
    assert_eq!(hit.license, "OFL");
    assert_eq!(hit.categories, vec!["Monospace"]);
}

#[test]
fn nerd_suffix_never_falls_back_to_another_source() {
    let repo = repository(&[
        (descriptor("Google Fonts", "google", 1), GOOGLE),
        (descriptor("Font Squirrel", "squirrel", 3), SQUIRREL),
    ]);
    assert_eq!(matched_id(&repo, "JetBrainsMonoNL Nerd Font"), None);
    assert_eq!(matched_id(&repo, "JetBrains Mono").as_deref(), Some("google.jetbrains-mono"));
}

#[test]
fn unknown_families_stay_unmatched() {
    let repo = catalog();
    assert_eq!(matched_id(&repo, "Comic Sans MS"), None);
    assert_eq!(matched_id(&repo, ""), None);
}

#[test]
fn batch_matching_skips_protected_families() {
    let repo = catalog();
    let families = ["Roboto", "Hack Nerd Font", "Segoe UI", "JetBrains Mono"];
    let protected = |family: &str| family == "Roboto";

    let matches = repo.match_installed_fonts(&families, Some(&protected));

    let ids: Vec<(&str, &str)> = matches
        .iter()
        .map(|(family, hit)| (family.as_str(), hit.font_id.as_str()))
        .collect();
    assert_eq!(
        ids,
        vec![
            ("Hack Nerd Font", "nerd.hack"),
            ("JetBrains Mono", "google.jetbrains-mono"),
        ]
    );
    assert_eq!(repo.match_installed_fonts(&families, None).len(), 3);
}

#[test]
fn dotted_query_resolves_directly() {
    let repo = catalog();
    match repo.resolve_font_query("GOOGLE.Roboto").expect("resolved") {
        FontResolution::Found { id, source_name, font } => {
            assert_eq!(id, "google.roboto");
            assert_eq!(source_name, "Google Fonts");
            assert_eq!(font.name, "Roboto");
        }
        other => panic!("unexpected resolution: {other:?}"),
    }
}

#[test]
fn unique_name_resolves_to_its_only_match() {
    let repo = catalog();
    match repo.resolve_font_query("hack nerd font").expect("resolved") {
        FontResolution::Found { id, source_name, .. } => {
            assert_eq!(id, "nerd.hack");
            assert_eq!(source_name, "Nerd Fonts");
        }
        other => panic!("unexpected resolution: {other:?}"),
    }
}

#[test]
fn shared_name_is_reported_as_ambiguous() {
    let repo = catalog();
    match repo.resolve_font_query("Roboto").expect("resolved") {
        FontResolution::Ambiguous(matches) => {
            let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
            assert_eq!(ids, vec!["google.roboto", "squirrel.roboto"]);
        }
        other => panic!("unexpected resolution: {other:?}"),
    }
}

#[test]
fn unresolvable_queries_name_the_query() {
    let repo = catalog();
    for query in ["Papyrus", "google.papyrus"] {
        let err = repo.resolve_font_query(query).unwrap_err();
        assert_eq!(err, CatalogError::FontNotFound { id: query.to_string() });
    }
}

#[test]
fn all_fonts_lists_the_whole_catalog_by_name() {
    let repo = catalog();
    let listing = repo.all_fonts();

    let ids: Vec<&str> = listing.iter().map(|r| r.catalog_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "google.fira-code",
            "nerd.fira-code",
            "nerd.hack",
            "google.jetbrains-mono",
            "nerd.jetbrains-mono",
            "google.roboto",
            "squirrel.roboto",
        ]
    );
    assert!(listing
        .iter()
        .all(|r| r.score == 0 && r.match_type == MatchType::Listing));
    assert_eq!(listing[2].source_display_name, "Nerd Fonts");
}
