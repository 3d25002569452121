use std::collections::{HashMap, HashSet};

use tagsieve::{Element, ElementFilter, Node, Relation, Way};

const UNMARKED_ENTRANCES: &str = "nodes with !entrance and !barrier and noexit != yes";
const BUILDINGS: &str = "ways, relations with building and \
     building !~ yes|no|service|shed|house|detached|terrace|semi|semidetached_house";
const PATHS: &str = "ways with highway ~ path|footway and area != yes and access !~ private|no";
const COVERED_WAYS: &str = "ways with (tunnel and tunnel != no) or covered = yes";

fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn node(id: i64, pairs: &[(&str, &str)]) -> Element {
    Element::Node(Node {
        id,
        tags: tags(pairs),
    })
}

fn way(id: i64, pairs: &[(&str, &str)], node_ids: &[i64]) -> Element {
    Element::Way(Way {
        id,
        tags: tags(pairs),
        node_ids: node_ids.to_vec(),
    })
}

fn relation(id: i64, pairs: &[(&str, &str)]) -> Element {
    Element::Relation(Relation {
        id,
        tags: tags(pairs),
        members: Vec::new(),
    })
}

fn way_node_ids(elements: &[Element], filter: &ElementFilter) -> HashSet<i64> {
    elements
        .iter()
        .filter(|element| filter.matches(element))
        .filter_map(|element| match element {
            Element::Way(way) => Some(way.node_ids.iter().copied()),
            _ => None,
        })
        .flatten()
        .collect()
}

#[test]
fn existence_filter_matches_only_tagged_nodes() {
    let filter = ElementFilter::parse("nodes with entrance").unwrap();
    assert!(filter.matches(&node(1, &[("entrance", "yes")])));
    assert!(!filter.matches(&node(2, &[("barrier", "gate")])));
}

#[test]
fn building_exclusion_spares_values_outside_the_list() {
    let filter =
        ElementFilter::parse("ways, relations with building and building !~ yes|no|service")
            .unwrap();
    assert!(filter.matches(&way(1, &[("building", "house")], &[])));
    assert!(!filter.matches(&way(2, &[("building", "service")], &[])));
    assert!(!filter.matches(&way(3, &[("building", "yes")], &[])));
    // wrong element type loses regardless of tags
    assert!(!filter.matches(&node(4, &[("building", "house")])));
}

#[test]
fn entrance_candidates_need_both_tags_absent() {
    let filter = ElementFilter::parse(UNMARKED_ENTRANCES).unwrap();

    assert!(filter.matches(&node(1, &[])));
    assert!(filter.matches(&node(2, &[("noexit", "no")])));
    assert!(!filter.matches(&node(3, &[("entrance", "main")])));
    assert!(!filter.matches(&node(4, &[("barrier", "gate")])));
    assert!(!filter.matches(&node(5, &[("noexit", "yes")])));
    // same tags on a way never match a nodes-only filter
    assert!(!filter.matches(&way(6, &[], &[])));
}

#[test]
fn building_filter_excludes_unwanted_values_but_not_absent_elements_of_other_types() {
    let filter = ElementFilter::parse(BUILDINGS).unwrap();

    assert!(filter.matches(&way(1, &[("building", "retail")], &[])));
    assert!(filter.matches(&relation(2, &[("building", "apartments")])));
    assert!(!filter.matches(&way(3, &[("building", "yes")], &[])));
    assert!(!filter.matches(&way(4, &[("building", "shed")], &[])));
    // the tag must exist at all
    assert!(!filter.matches(&way(5, &[("name", "depot")], &[])));
    // nodes are outside the selector
    assert!(!filter.matches(&node(6, &[("building", "retail")])));
}

#[test]
fn path_filter_combines_alternation_and_negations() {
    let filter = ElementFilter::parse(PATHS).unwrap();

    assert!(filter.matches(&way(1, &[("highway", "footway")], &[])));
    assert!(filter.matches(&way(2, &[("highway", "path"), ("access", "yes")], &[])));
    assert!(!filter.matches(&way(3, &[("highway", "residential")], &[])));
    assert!(!filter.matches(&way(4, &[("highway", "path"), ("area", "yes")], &[])));
    assert!(!filter.matches(&way(5, &[("highway", "footway"), ("access", "private")], &[])));
}

#[test]
fn grouped_or_expression_matches_either_branch() {
    let filter = ElementFilter::parse(COVERED_WAYS).unwrap();

    assert!(filter.matches(&way(1, &[("tunnel", "culvert")], &[])));
    assert!(filter.matches(&way(2, &[("covered", "yes")], &[])));
    assert!(!filter.matches(&way(3, &[("tunnel", "no")], &[])));
    assert!(!filter.matches(&way(4, &[("covered", "no")], &[])));
    assert!(!filter.matches(&way(5, &[], &[])));
}

#[test]
fn dangling_operator_reports_its_position() {
    let source = "ways with highway ~";
    let err = ElementFilter::parse(source).unwrap_err();
    assert_eq!(err.position(), source.len());
    assert_eq!(
        err.to_string(),
        "syntax error at position 19: expected a tag value"
    );
}

#[test]
fn building_entrance_candidates_join_ways_to_nodes() {
    let buildings = ElementFilter::parse(BUILDINGS).unwrap();
    let paths = ElementFilter::parse(PATHS).unwrap();
    let covered = ElementFilter::parse(COVERED_WAYS).unwrap();
    let entrances = ElementFilter::parse(UNMARKED_ENTRANCES).unwrap();

    let elements = vec![
        way(100, &[("building", "retail")], &[1, 2, 3, 4, 5, 1]),
        // excluded by the building list, so its outline contributes nothing
        way(101, &[("building", "yes")], &[6, 7]),
        way(102, &[("highway", "footway")], &[8, 2, 3, 5]),
        // reaches the outline underground, which disqualifies node 4
        way(103, &[("highway", "path"), ("tunnel", "culvert")], &[9, 4]),
        node(1, &[]),
        node(2, &[]),
        node(3, &[("entrance", "main")]),
        node(4, &[]),
        node(5, &[]),
        node(6, &[]),
        node(8, &[]),
        node(9, &[]),
    ];

    let building_node_ids = way_node_ids(&elements, &buildings);
    let path_node_ids = way_node_ids(&elements, &paths);
    let covered_node_ids = way_node_ids(&elements, &covered);

    // an entrance candidate sits where a path meets a building outline
    // above ground and carries no entrance tagging of its own
    let candidate_ids: Vec<i64> = elements
        .iter()
        .filter(|element| entrances.matches(element))
        .map(|element| element.id())
        .filter(|id| {
            building_node_ids.contains(id)
                && path_node_ids.contains(id)
                && !covered_node_ids.contains(id)
        })
        .collect();

    assert_eq!(candidate_ids, vec![2, 5]);
}

#[test]
fn multi_line_filters_with_comments_parse() {
    let source = "nodes with\n\
                  # unmarked entrance candidates\n\
                  !entrance\n\
                  and !barrier\n\
                  and noexit != yes\n";
    let filter = ElementFilter::parse(source).unwrap();
    assert!(filter.matches(&node(1, &[])));
    assert!(!filter.matches(&node(2, &[("noexit", "yes")])));
}

#[test]
fn resurvey_filter_combines_dates_and_existence() {
    let filter =
        ElementFilter::parse("nodes with shop and (!check_date or check_date < today - 8 years)")
            .unwrap();

    assert!(filter.matches(&node(1, &[("shop", "bakery")])));
    assert!(filter.matches(&node(2, &[("shop", "bakery"), ("check_date", "2000-01-01")])));
    assert!(!filter.matches(&node(3, &[("shop", "bakery"), ("check_date", "9999-01-01")])));
    assert!(!filter.matches(&node(4, &[("check_date", "2000-01-01")])));
}
