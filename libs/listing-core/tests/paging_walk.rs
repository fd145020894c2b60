//! Walking `links.next` from the first page visits every row exactly once.

use listing_core::{build_links, build_meta, PageRequest};
use url::Url;

fn offset_of(link: &str) -> i64 {
    let url = Url::parse(&format!("http://localhost{link}")).unwrap();
    url.query_pairs()
        .find(|(k, _)| k == "offset")
        .map(|(_, v)| v.parse().unwrap())
        .unwrap()
}

#[test]
fn following_next_reproduces_the_unbounded_result() {
    let rows: Vec<u32> = (0..23).collect();

    for limit in [1i64, 5, 10, 23, 50] {
        let mut seen = Vec::new();
        let mut offset = 0i64;
        loop {
            let start = offset as usize;
            let end = (start + limit as usize).min(rows.len());
            seen.extend_from_slice(&rows[start..end]);

            let meta = build_meta(rows.len() as u64, PageRequest::new(limit, offset));
            let links = build_links("/systems", Some("sort=id"), &meta);
            assert!(end - start <= limit as usize);
            match links.next {
                Some(next) => offset = offset_of(&next),
                None => break,
            }
        }
        assert_eq!(seen, rows, "limit {limit}");
    }
}

#[test]
fn last_link_points_at_final_page() {
    let meta = build_meta(23, PageRequest::new(5, 0));
    let links = build_links("/systems", None, &meta);
    assert_eq!(offset_of(&links.last), 20);
    assert_eq!(offset_of(&links.first), 0);
}
