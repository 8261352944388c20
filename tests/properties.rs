use ops_command_center::columns::{resolve, ColumnMap, Field};
use ops_command_center::filter::search;
use ops_command_center::models::{Record, SourceKind};
use ops_command_center::selection::SelectionSet;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn lead(id: usize, name: &str, email: &str, organization: &str) -> Record {
    Record::from_pairs(
        SourceKind::Leads,
        &[
            ("Lead ID", format!("L{id}").as_str()),
            ("Name", name),
            ("Email", email),
            ("Organization", organization),
            ("Status", "Pending Review"),
        ],
    )
}

fn leads_strategy() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(("[a-zA-Z ]{0,10}", "[a-z@.]{0,10}", "[a-zA-Z ]{0,10}"), 0..12).prop_map(|rows| {
        rows.iter()
            .enumerate()
            .map(|(index, (name, email, organization))| lead(index, name, email, organization))
            .collect()
    })
}

fn case_variant(text: &str, mask: &[bool]) -> String {
    text.chars()
        .zip(mask.iter().cycle())
        .map(|(ch, upper)| if *upper { ch.to_ascii_uppercase() } else { ch.to_ascii_lowercase() })
        .collect()
}

proptest! {
    #[test]
    fn empty_query_is_identity(records in leads_strategy()) {
        let found = search(&records, "");
        prop_assert_eq!(found.len(), records.len());
        for (found, original) in found.iter().zip(records.iter()) {
            prop_assert_eq!(&found.id, &original.id);
        }
    }

    #[test]
    fn every_hit_contains_the_query(records in leads_strategy(), query in "[a-zA-Z@.]{1,3}") {
        let needle = query.to_lowercase();
        let found = search(&records, &query);
        for record in &found {
            let hit = [Field::Name, Field::Email, Field::Organization]
                .iter()
                .any(|field| record.field(*field).to_lowercase().contains(&needle));
            prop_assert!(hit, "{} matched without containing {}", record.id, query);
        }
        let misses = records
            .iter()
            .filter(|record| !found.iter().any(|hit| hit.id == record.id))
            .filter(|record| record.field(Field::Name).to_lowercase().contains(&needle))
            .count();
        prop_assert_eq!(misses, 0);
    }

    #[test]
    fn resync_keeps_selection_inside_universe(
        first in prop::collection::vec("[a-d][0-9]", 0..10),
        second in prop::collection::vec("[a-d][0-9]", 0..10),
        picks in prop::collection::vec(any::<bool>(), 10),
    ) {
        let mut selection = SelectionSet::new();
        selection.sync_universe(first.clone());
        for (id, pick) in first.iter().zip(picks.iter()) {
            if *pick {
                selection.set(id, true);
            }
        }
        let before: BTreeSet<String> = selection.selected_ids().into_iter().collect();

        selection.sync_universe(second.clone());
        let universe: BTreeSet<String> = second.iter().cloned().collect();
        let after: BTreeSet<String> = selection.selected_ids().into_iter().collect();
        prop_assert!(after.is_subset(&universe));
        prop_assert_eq!(after, before.intersection(&universe).cloned().collect::<BTreeSet<_>>());
    }

    #[test]
    fn select_all_matches_unique_universe(ids in prop::collection::vec("[a-c][0-9]", 0..12)) {
        let mut selection = SelectionSet::new();
        selection.sync_universe(ids.clone());
        selection.select_all(true);
        let unique: BTreeSet<&String> = ids.iter().collect();
        prop_assert_eq!(selection.count(), unique.len());
        prop_assert_eq!(selection.all_selected(), !unique.is_empty());
        selection.select_all(false);
        prop_assert_eq!(selection.count(), 0);
    }

    #[test]
    fn select_all_tracks_every_later_universe(
        first in prop::collection::vec("[a-c][0-9]", 1..8),
        later in prop::collection::vec(prop::collection::vec("[a-c][0-9]", 0..8), 1..4),
    ) {
        let mut selection = SelectionSet::new();
        selection.sync_universe(first);
        selection.select_all(true);
        for ids in later {
            selection.sync_universe(ids.clone());
            let unique: BTreeSet<&String> = ids.iter().collect();
            prop_assert_eq!(selection.count(), unique.len());
        }
    }

    #[test]
    fn status_header_resolves_regardless_of_case_and_padding(
        mask in prop::collection::vec(any::<bool>(), 1..8),
        padding in 0usize..3,
        position in 0usize..3,
    ) {
        let header = format!("{}{}", case_variant("Status", &mask), " ".repeat(padding));
        let mut headers = vec!["Name".to_string(), "Email".to_string()];
        headers.insert(position, header);
        prop_assert_eq!(resolve(&headers, Field::Status, SourceKind::Leads), Some(position));
        let map = ColumnMap::new(SourceKind::Leads, headers);
        prop_assert_eq!(map.index_of(Field::Status), Some(position));
    }

    #[test]
    fn task_id_resolves_from_any_known_spelling(
        spelling in prop::sample::select(vec!["Task ID", "Task ID ", "task_id", "OPSI ID", "taskId", "TASK-ID"]),
    ) {
        let headers = vec!["Title".to_string(), spelling.to_string()];
        prop_assert_eq!(resolve(&headers, Field::Id, SourceKind::Tasks), Some(1));
    }
}
