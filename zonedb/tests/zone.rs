// Copyright (C) 2025, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

#![allow(clippy::unwrap_used)]

use zonedb::{NameError, Rr, Zone, ZoneError};

const A: u16 = 1;
const NS: u16 = 2;
const TXT: u16 = 16;
const IN: u16 = 1;

fn populated() -> Zone {
    let mut zone = Zone::new();
    zone.add_rr("example.org", NS, IN, 3600, b"ns1.example.org").unwrap();
    zone.add_rr("example.org", NS, IN, 3600, b"ns2.example.org").unwrap();
    zone.add_rr("www.example.org", A, IN, 300, &[192, 0, 2, 10]).unwrap();
    zone.add_rr("www.example.org", A, IN, 300, &[192, 0, 2, 11]).unwrap();
    zone.add_rr("mail.example.org", A, IN, 300, &[192, 0, 2, 20]).unwrap();
    zone
}

#[test]
fn lookups_find_what_was_added() {
    let zone = populated();
    assert_eq!(zone.domain_count(), 3);

    let ns = zone.find_rrset("example.org", NS).unwrap().unwrap();
    assert_eq!(ns.rrs.len(), 2);

    let www = zone.find_rrset("www.example.org", A).unwrap().unwrap();
    assert_eq!(
        www.rrs,
        vec![
            Rr {
                class: IN,
                ttl: 300,
                rdata: vec![192, 0, 2, 10]
            },
            Rr {
                class: IN,
                ttl: 300,
                rdata: vec![192, 0, 2, 11]
            },
        ]
    );

    // absent type and absent name are plain None
    assert_eq!(zone.find_rrset("www.example.org", TXT).unwrap(), None);
    assert_eq!(zone.find_rrset("gone.example.org", A).unwrap(), None);
}

#[test]
fn names_come_back_in_canonical_order() {
    let zone = populated();
    let names: Vec<String> = zone.names().collect();
    // the apex first, then children by label
    assert_eq!(names, vec!["example.org", "mail.example.org", "www.example.org"]);
}

#[test]
fn readding_a_record_refreshes_its_ttl() {
    let mut zone = populated();
    zone.add_rr("www.example.org", A, IN, 900, &[192, 0, 2, 10]).unwrap();

    let www = zone.find_rrset("www.example.org", A).unwrap().unwrap();
    assert_eq!(www.rrs.len(), 2);
    assert_eq!(www.rrs[0].ttl, 900);
    assert_eq!(www.rrs[1].ttl, 300);
}

#[test]
fn deleting_the_last_record_drops_the_levels_above_it() {
    let mut zone = populated();

    // two records in the rrset: the first delete keeps the rrset and domain
    assert!(zone.delete_rr("www.example.org", A, &[192, 0, 2, 10]).unwrap());
    assert_eq!(
        zone.find_rrset("www.example.org", A).unwrap().unwrap().rrs.len(),
        1
    );

    // the second empties rrset and domain; the name disappears
    assert!(zone.delete_rr("www.example.org", A, &[192, 0, 2, 11]).unwrap());
    assert_eq!(zone.find_domain("www.example.org").unwrap(), None);
    assert_eq!(zone.domain_count(), 2);

    // deleting again is a no-op, not an error
    assert!(!zone.delete_rr("www.example.org", A, &[192, 0, 2, 11]).unwrap());
}

#[test]
fn emptying_the_zone_leaves_it_empty() {
    let mut zone = populated();
    assert!(zone.delete_rr("example.org", NS, b"ns1.example.org").unwrap());
    assert!(zone.delete_rr("example.org", NS, b"ns2.example.org").unwrap());
    assert!(zone.delete_rr("www.example.org", A, &[192, 0, 2, 10]).unwrap());
    assert!(zone.delete_rr("www.example.org", A, &[192, 0, 2, 11]).unwrap());
    assert!(zone.delete_rr("mail.example.org", A, &[192, 0, 2, 20]).unwrap());

    assert!(zone.is_empty());
    assert_eq!(zone.names().count(), 0);
}

#[test]
fn bad_names_are_rejected_up_front() {
    let mut zone = Zone::new();
    assert_eq!(
        zone.add_rr("no..good", A, IN, 60, &[0, 0, 0, 1]),
        Err(ZoneError::Name(NameError::EmptyLabel))
    );
    assert!(zone.is_empty());

    assert_eq!(
        zone.delete_rr("no..good", A, &[0, 0, 0, 1]),
        Err(ZoneError::Name(NameError::EmptyLabel))
    );
    assert_eq!(
        zone.find_rrset("no..good", A),
        Err(NameError::EmptyLabel)
    );
}

#[test]
fn rrsets_stay_sorted_by_type() {
    let mut zone = Zone::new();
    zone.add_rr("example.org", TXT, IN, 60, b"v=spf1 -all").unwrap();
    zone.add_rr("example.org", A, IN, 60, &[192, 0, 2, 1]).unwrap();
    zone.add_rr("example.org", NS, IN, 60, b"ns1.example.org").unwrap();

    let rrsets = zone.find_domain("example.org").unwrap().unwrap();
    let types: Vec<u16> = rrsets.iter().map(|rrset| rrset.rtype).collect();
    assert_eq!(types, vec![A, NS, TXT]);
}
