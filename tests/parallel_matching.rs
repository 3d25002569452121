use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use tagsieve::{Element, ElementFilter, FilterCache, Node, Way, compile_cached};

fn synthetic_elements(count: i64) -> Vec<Element> {
    (0..count)
        .map(|i| {
            let mut tags = HashMap::new();
            if i % 2 == 0 {
                tags.insert("highway".to_string(), "residential".to_string());
            }
            tags.insert("lanes".to_string(), (i % 5).to_string());
            if i % 3 == 0 {
                Element::Way(Way {
                    id: i,
                    tags,
                    node_ids: vec![i, i + 1],
                })
            } else {
                Element::Node(Node { id: i, tags })
            }
        })
        .collect()
}

#[test]
fn parallel_matching_agrees_with_serial() {
    let filter = ElementFilter::parse("ways with highway and lanes >= 2").unwrap();
    let elements = synthetic_elements(10_000);

    let serial: Vec<i64> = elements
        .iter()
        .filter(|element| filter.matches(element))
        .map(|element| element.id())
        .collect();
    let parallel: Vec<i64> = elements
        .par_iter()
        .filter(|element| filter.matches(element))
        .map(|element| element.id())
        .collect();

    assert!(!serial.is_empty());
    assert_eq!(serial, parallel);
}

#[test]
fn one_compiled_filter_serves_many_threads() {
    let filter = Arc::new(ElementFilter::parse("nodes with lanes > 2").unwrap());
    let elements = Arc::new(synthetic_elements(4_000));

    let expected = elements
        .iter()
        .filter(|element| filter.matches(element))
        .count();

    let counted: usize = thread::scope(|scope| {
        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let filter = Arc::clone(&filter);
                let elements = Arc::clone(&elements);
                scope.spawn(move || {
                    elements
                        .iter()
                        .skip(worker)
                        .step_by(4)
                        .filter(|element| filter.matches(element))
                        .count()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).sum()
    });

    assert_eq!(counted, expected);
}

#[test]
fn cache_is_shared_across_worker_threads() {
    let cache = FilterCache::new();
    let sources = [
        "nodes with entrance",
        "ways with building and building != yes",
    ];

    (0..64usize).into_par_iter().for_each(|i| {
        cache.get_or_compile(sources[i % 2]).unwrap();
    });

    assert_eq!(cache.len(), 2);
}

#[test]
fn global_cache_compiles_each_source_once() {
    let compiled: Vec<_> = (0..16)
        .into_par_iter()
        .map(|_| compile_cached("relations with type = multipolygon").unwrap())
        .collect();
    for filter in &compiled[1..] {
        assert!(Arc::ptr_eq(&compiled[0], filter));
    }
}
