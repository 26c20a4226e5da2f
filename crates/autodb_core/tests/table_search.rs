mod common;

use autodb_core::model::entity::descriptor_of;
use autodb_core::scan::table_search::entities_namespace;
use autodb_core::{ConventionTableSearch, DbConfig, DbContext, ExplicitTableSearch, TableSearch};
use common::shop::entities::archive::Invoice;
use common::shop::entities::{Customer, Order};
use common::shop::ShopContext;

fn shop_namespace() -> &'static str {
    ShopContext::new(DbConfig::default()).namespace()
}

#[test]
fn convention_scan_finds_entities_module_sorted_by_table() {
    let search = ConventionTableSearch::new();
    assert!(!search.scanned());

    let tables = search.search_table(shop_namespace());
    let names = tables.iter().map(|table| table.table).collect::<Vec<_>>();
    assert_eq!(names, vec!["customers", "orders"]);
    assert!(tables[0].is::<Customer>());
    assert!(tables[1].is::<Order>());
    assert!(search.scanned());
}

#[test]
fn convention_scan_ignores_nested_modules() {
    let search = ConventionTableSearch::new();
    let tables = search.search_table(shop_namespace());
    assert!(tables.iter().all(|table| !table.is::<Invoice>()));

    let archive = descriptor_of::<Invoice>().unwrap();
    assert_eq!(
        archive.namespace,
        format!("{}::archive", entities_namespace(shop_namespace()))
    );
}

#[test]
fn first_non_empty_scan_is_served_for_every_namespace() {
    let search = ConventionTableSearch::new();
    let first = search.search_table(shop_namespace());
    assert_eq!(first.len(), 2);

    let other = search.search_table("elsewhere::store");
    assert_eq!(other.len(), 2);
    assert!(other[0].is::<Customer>());
}

#[test]
fn empty_scan_is_not_cached() {
    let search = ConventionTableSearch::new();
    assert!(search.search_table("elsewhere::store").is_empty());
    assert!(!search.scanned());

    assert_eq!(search.search_table(shop_namespace()).len(), 2);
    assert!(search.scanned());
}

#[test]
fn explicit_search_ignores_namespace_and_deduplicates() {
    let search = ExplicitTableSearch::new()
        .with::<Invoice>()
        .with::<Customer>()
        .with::<Invoice>();
    assert_eq!(search.len(), 2);
    assert!(search.scanned());

    let tables = search.search_table("anything");
    assert!(tables[0].is::<Invoice>());
    assert!(tables[1].is::<Customer>());
    assert_eq!(tables[1].namespace, entities_namespace(shop_namespace()));
}

#[test]
fn empty_explicit_search_reports_nothing_scanned() {
    let search = ExplicitTableSearch::new();
    assert!(search.is_empty());
    assert!(!search.scanned());
    assert!(search.search_table(shop_namespace()).is_empty());
}
