//! Algorithm resolution tests
//!
//! Exercise the registry's fetch path end to end with mock providers:
//! property-based selection, caching, invalidation and method lifetimes.

use cryptfetch_core::*;
use cryptfetch_test_utils::{DigestTableBuilder, MockProvider, byte_sum, xor_key_exchange};
use std::sync::Arc;
use std::thread;

fn provider_of(method: &DigestMethod) -> Option<String> {
    FetchableMethod::provider(method).map(|provider| provider.name().to_string())
}

/// Two providers offering TOY: p1 with fips=yes, p2 with fips=no
fn two_provider_registry() -> Registry {
    let registry = Registry::new();
    registry
        .load_provider(MockProvider::new("p1").with_digest(
            "TOY:TOY-ALIAS",
            "provider=p1,fips=yes",
            DigestTableBuilder::new().with_seed(1).build(),
        ))
        .unwrap();
    registry
        .load_provider(MockProvider::new("p2").with_digest(
            "TOY",
            "provider=p2,fips=no",
            DigestTableBuilder::new().with_seed(2).build(),
        ))
        .unwrap();
    registry
}

mod selection_tests {
    use super::*;

    #[test]
    fn test_property_query_selects_provider() {
        let registry = two_provider_registry();

        let fips = registry.fetch_digest("TOY", Some("fips=yes")).unwrap();
        let non_fips = registry.fetch_digest("TOY", Some("fips=no")).unwrap();

        assert_eq!(provider_of(&fips).as_deref(), Some("p1"));
        assert_eq!(provider_of(&non_fips).as_deref(), Some("p2"));
        assert_eq!(digest_oneshot(&fips, b"ab").unwrap(), byte_sum(1, b"ab"));
        assert_eq!(digest_oneshot(&non_fips, b"ab").unwrap(), byte_sum(2, b"ab"));
    }

    #[test]
    fn test_equal_scores_prefer_latest_registration() {
        let registry = two_provider_registry();

        let method = registry.fetch_digest("TOY", None).unwrap();

        assert_eq!(provider_of(&method).as_deref(), Some("p2"));
    }

    #[test]
    fn test_optional_clause_prefers_but_does_not_require() {
        let registry = two_provider_registry();

        let preferred = registry.fetch_digest("TOY", Some("?provider=p1")).unwrap();
        let fallback = registry.fetch_digest("TOY", Some("?provider=p3")).unwrap();

        assert_eq!(provider_of(&preferred).as_deref(), Some("p1"));
        assert!(provider_of(&fallback).is_some());
    }

    #[test]
    fn test_no_match_is_unsupported() {
        let registry = two_provider_registry();

        let error = registry.fetch_digest("TOY", Some("provider=p3")).unwrap_err();

        assert!(error.is_unsupported());
    }

    #[test]
    fn test_alias_resolves_to_same_method() {
        let registry = two_provider_registry();

        let by_name = registry.fetch_digest("toy", Some("provider=p1")).unwrap();
        let by_alias = registry.fetch_digest("TOY-ALIAS", Some("provider=p1")).unwrap();

        assert!(by_name.same_method(&by_alias));
    }

    #[test]
    fn test_unknown_name_is_unsupported() {
        let registry = two_provider_registry();

        let error = registry.fetch_digest("WHIRLPOOL", None).unwrap_err();

        assert!(error.is_unsupported());
        assert!(error.to_string().contains("WHIRLPOOL"));
    }

    #[test]
    fn test_malformed_query_is_rejected() {
        let registry = two_provider_registry();

        let error = registry.fetch_digest("TOY", Some("fips==yes")).unwrap_err();

        assert!(!error.is_unsupported());
    }

    #[test]
    fn test_incomplete_table_is_skipped() {
        let registry = Registry::new();
        registry
            .load_provider(
                MockProvider::new("broken")
                    .with_digest("TOY", "provider=broken", DigestTableBuilder::new().omit(3).build())
                    .with_digest("NOSIZE", "provider=broken", DigestTableBuilder::new().without_size().build()),
            )
            .unwrap();
        registry
            .load_provider(MockProvider::new("good").with_digest(
                "TOY",
                "provider=good",
                DigestTableBuilder::new().build(),
            ))
            .unwrap();

        let method = registry.fetch_digest("TOY", None).unwrap();

        assert_eq!(provider_of(&method).as_deref(), Some("good"));
        assert!(registry.fetch_digest("NOSIZE", None).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_wrong_operation_type_not_found() {
        let registry = Registry::new();
        registry
            .load_provider(MockProvider::new("kx").with_key_exchange(
                "XOR",
                "provider=kx",
                xor_key_exchange(),
            ))
            .unwrap();

        assert!(registry.fetch_digest("XOR", None).unwrap_err().is_unsupported());
        assert!(registry.fetch_key_exchange("XOR", None).is_ok());
    }
}

mod cache_tests {
    use super::*;

    #[test]
    fn test_repeated_fetch_does_not_query_providers() {
        let registry = Registry::new();
        let provider = MockProvider::new("p1").with_digest(
            "TOY",
            "provider=p1",
            DigestTableBuilder::new().build(),
        );
        let queries = provider.query_counter();
        registry.load_provider(provider).unwrap();

        let first = registry.fetch_digest("TOY", Some("provider=p1")).unwrap();
        let after_first = queries.get();
        let second = registry.fetch_digest("TOY", Some("provider=p1")).unwrap();
        let other_query = registry.fetch_digest("TOY", None).unwrap();

        assert!(after_first > 0);
        assert_eq!(queries.get(), after_first);
        assert!(first.same_method(&second));
        assert!(first.same_method(&other_query));
        assert_eq!(registry.store().len(), 1);
    }

    #[test]
    fn test_alias_fetched_first_still_sees_every_provider() {
        // Only p1 lists TOY-ALIAS; p2 offers the same algorithm as TOY
        let registry = two_provider_registry();

        let by_alias = registry.fetch_digest("TOY-ALIAS", None).unwrap();
        let pinned = registry.fetch_digest("TOY", Some("provider=p2")).unwrap();
        let by_name = registry.fetch_digest("TOY", None).unwrap();

        assert_eq!(provider_of(&by_alias).as_deref(), Some("p2"));
        assert_eq!(provider_of(&pinned).as_deref(), Some("p2"));
        assert_eq!(provider_of(&by_name).as_deref(), Some("p2"));
        assert_eq!(registry.store().len(), 2);
    }

    #[test]
    fn test_default_properties_change_invalidates_cache() {
        let registry = two_provider_registry();
        let before = registry.fetch_digest("TOY", None).unwrap();
        assert_eq!(provider_of(&before).as_deref(), Some("p2"));
        assert!(registry.store().cache_len() > 0);

        registry.set_default_properties("fips=yes").unwrap();

        assert_eq!(registry.store().cache_len(), 0);
        let after = registry.fetch_digest("TOY", None).unwrap();
        assert_eq!(provider_of(&after).as_deref(), Some("p1"));
        let overridden = registry.fetch_digest("TOY", Some("fips=no")).unwrap();
        assert_eq!(provider_of(&overridden).as_deref(), Some("p2"));
    }

    #[test]
    fn test_provider_load_refreshes_resolution() {
        let registry = Registry::new();
        registry
            .load_provider(MockProvider::new("p1").with_digest(
                "TOY",
                "provider=p1",
                DigestTableBuilder::new().build(),
            ))
            .unwrap();
        assert_eq!(
            provider_of(&registry.fetch_digest("TOY", None).unwrap()).as_deref(),
            Some("p1")
        );

        registry
            .load_provider(MockProvider::new("p2").with_digest(
                "TOY",
                "provider=p2",
                DigestTableBuilder::new().build(),
            ))
            .unwrap();

        assert_eq!(
            provider_of(&registry.fetch_digest("TOY", None).unwrap()).as_deref(),
            Some("p2")
        );
        assert_eq!(registry.store().len(), 2);
    }

    #[test]
    fn test_disabled_cache_still_resolves() {
        let registry = Registry::from_config(RegistryConfig {
            load_default_provider: false,
            cache_capacity: 0,
            ..RegistryConfig::default()
        })
        .unwrap();
        registry
            .load_provider(MockProvider::new("p1").with_digest(
                "TOY",
                "provider=p1",
                DigestTableBuilder::new().build(),
            ))
            .unwrap();

        let first = registry.fetch_digest("TOY", None).unwrap();
        let second = registry.fetch_digest("TOY", None).unwrap();

        assert!(first.same_method(&second));
        assert_eq!(registry.store().cache_len(), 0);
    }
}

mod lifetime_tests {
    use super::*;

    #[test]
    fn test_every_constructed_method_is_released() {
        let registry = two_provider_registry();
        let p1 = registry.find_provider("p1").unwrap();
        let p2 = registry.find_provider("p2").unwrap();

        let method = registry.fetch_digest("TOY", Some("fips=yes")).unwrap();
        let _ = registry.fetch_digest("TOY", Some("fips=no")).unwrap();
        let mut ctx = DigestContext::new();
        ctx.init(&method).unwrap();
        drop(registry);

        assert_eq!(p1.live_methods(), 1);
        assert_eq!(p2.live_methods(), 0);
        drop(method);
        assert_eq!(p1.live_methods(), 1);
        drop(ctx);
        assert_eq!(p1.methods_constructed(), p1.methods_released());
        assert_eq!(p2.methods_constructed(), p2.methods_released());
    }

    #[test]
    fn test_method_constructed_once_per_provider() {
        let registry = two_provider_registry();
        let p1 = registry.find_provider("p1").unwrap();

        for query in ["", "fips=yes", "provider=p1", "?fips=yes"] {
            registry.fetch_digest("TOY", Some(query)).unwrap();
        }
        registry.fetch_digest("TOY-ALIAS", None).unwrap();

        assert_eq!(p1.methods_constructed(), 1);
    }

    #[test]
    fn test_fetched_handle_adds_reference() {
        let registry = two_provider_registry();

        let method = registry.fetch_digest("TOY", Some("provider=p1")).unwrap();
        let count = method.ref_count().unwrap();
        let again = method.clone();

        assert_eq!(again.ref_count(), Some(count + 1));
    }
}

mod legacy_fallback_tests {
    use super::*;

    #[test]
    fn test_fallback_to_builtin() {
        let registry = Registry::new();

        let method = registry.get_digest("CRC32", None).unwrap();

        assert!(method.is_legacy());
        assert_eq!(
            digest_oneshot(&method, b"123456789").unwrap(),
            vec![0xCB, 0xF4, 0x39, 0x26]
        );
        assert!(registry.fetch_digest("CRC32", None).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_provider_wins_over_builtin() {
        let registry = Registry::new();
        registry
            .load_provider(MockProvider::new("p1").with_digest(
                "CRC32",
                "provider=p1",
                DigestTableBuilder::new().build(),
            ))
            .unwrap();

        let method = registry.get_digest("crc32", None).unwrap();

        assert!(!method.is_legacy());
    }

    #[test]
    fn test_fallback_disabled() {
        let registry = Registry::from_config(RegistryConfig {
            load_default_provider: false,
            legacy_fallback: false,
            ..RegistryConfig::default()
        })
        .unwrap();

        assert!(registry.get_digest("CRC32", None).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_unknown_builtin_is_unsupported() {
        let registry = Registry::new();

        assert!(registry.get_digest("NOPE", None).unwrap_err().is_unsupported());
    }
}

mod listing_tests {
    use super::*;

    #[test]
    fn test_list_sorted_by_name_then_provider() {
        let registry = Registry::new();
        registry
            .load_provider(
                MockProvider::new("zeta")
                    .with_digest("beta", "provider=zeta", DigestTableBuilder::new().build())
                    .with_digest("Alpha:A", "provider=zeta", DigestTableBuilder::new().build()),
            )
            .unwrap();
        registry
            .load_provider(
                MockProvider::new("eta")
                    .with_digest("BETA", "provider=eta", DigestTableBuilder::new().build())
                    .with_digest("BROKEN", "provider=eta", DigestTableBuilder::new().omit(4).build()),
            )
            .unwrap();

        let listing = registry.list_digests();
        let rows: Vec<(&str, &str)> = listing
            .iter()
            .map(|info| (info.name.as_str(), info.provider.as_str()))
            .collect();

        assert_eq!(rows, vec![("Alpha", "zeta"), ("BETA", "eta"), ("beta", "zeta")]);
        assert_eq!(listing[0].aliases, vec!["Alpha", "A"]);
        assert_eq!(listing[0].properties, "provider=zeta");
    }

    #[test]
    fn test_enumerate_does_not_store() {
        let registry = two_provider_registry();
        let mut seen = Vec::new();

        registry.enumerate_all::<DigestMethod>(|provider, name, method| {
            seen.push((provider.name().to_string(), name.to_string(), method.size()));
        });

        assert_eq!(
            seen,
            vec![
                ("p1".to_string(), "TOY".to_string(), 8),
                ("p2".to_string(), "TOY".to_string(), 8),
            ]
        );
        assert!(registry.store().is_empty());
        let p1 = registry.find_provider("p1").unwrap();
        assert_eq!(p1.live_methods(), 0);
    }

    #[test]
    fn test_listing_serializes() {
        let registry = two_provider_registry();

        let json = serde_json::to_string(&registry.list_digests()).unwrap();
        let parsed: Vec<AlgorithmInfo> = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, registry.list_digests());
    }
}

mod concurrency_tests {
    use super::*;

    #[test]
    fn test_concurrent_fetch_converges_on_one_method() {
        let registry = Arc::new(two_provider_registry());
        let p1 = registry.find_provider("p1").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let query = if i % 2 == 0 { "fips=yes" } else { "provider=p1" };
                    let method = registry.fetch_digest("TOY", Some(query)).unwrap();
                    digest_oneshot(&method, b"xyz").unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), byte_sum(1, b"xyz"));
        }
        let a = registry.fetch_digest("TOY", Some("fips=yes")).unwrap();
        let b = registry.fetch_digest("TOY", Some("provider=p1")).unwrap();
        assert!(a.same_method(&b));
        assert_eq!(registry.store().len(), 2);
        drop((a, b));
        drop(registry);
        assert_eq!(p1.live_methods(), 0);
    }
}
