// Property-based tests for invitation processing order and placement

use aws_account_migration::migration::mocks::{CallJournal, InMemoryDirectory};
use aws_account_migration::migration::{
    management_last, Account, AutoConfirm, Handshake, Organization, TargetOptions,
    TargetOrganization,
};
use proptest::prelude::*;
use std::sync::Arc;
use tracing::Span;

const MANAGEMENT: &str = "000000000000";

// Strategy for 12-digit member account ids that never collide with the management account
fn member_account_strategy() -> impl Strategy<Value = String> {
    (1u64..=999_999_999_999).prop_map(|n| format!("{n:012}"))
}

fn handshakes_strategy() -> impl Strategy<Value = (Vec<Handshake>, Option<usize>)> {
    prop::collection::vec(member_account_strategy(), 0..12).prop_flat_map(|accounts| {
        let len = accounts.len();
        let handshakes: Vec<Handshake> = accounts
            .iter()
            .enumerate()
            .map(|(i, account)| Handshake::invitation(&format!("h-{i}"), account, "o-target"))
            .collect();
        (Just(handshakes), prop::option::of(0..=len))
    })
}

fn with_management_at(mut handshakes: Vec<Handshake>, position: Option<usize>) -> Vec<Handshake> {
    if let Some(position) = position {
        handshakes.insert(
            position,
            Handshake::invitation("h-management", MANAGEMENT, "o-target"),
        );
    }
    handshakes
}

proptest! {
    #[test]
    fn management_handshake_is_always_last((handshakes, position) in handshakes_strategy()) {
        let input = with_management_at(handshakes, position);
        let ordered = management_last(input.clone(), MANAGEMENT).unwrap();

        prop_assert_eq!(ordered.len(), input.len());
        if position.is_some() {
            prop_assert_eq!(ordered.last().map(|h| h.id.as_str()), Some("h-management"));
        }
    }

    #[test]
    fn member_order_is_preserved((handshakes, position) in handshakes_strategy()) {
        let expected: Vec<String> = handshakes.iter().map(|h| h.id.clone()).collect();
        let ordered = management_last(with_management_at(handshakes, position), MANAGEMENT).unwrap();

        let members: Vec<String> = ordered
            .iter()
            .filter(|h| h.id != "h-management")
            .map(|h| h.id.clone())
            .collect();
        prop_assert_eq!(members, expected);
    }

    #[test]
    fn placement_without_destination_never_moves(accounts in prop::collection::vec(member_account_strategy(), 1..8)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let journal = CallJournal::new();

        let report = runtime.block_on(async {
            let directory = InMemoryDirectory::organization(
                "target",
                journal.clone(),
                Organization {
                    id: "o-target".to_string(),
                    management_account_id: "999999999999".to_string(),
                    management_account_email: "target@example.com".to_string(),
                },
                Account::new("999999999999", "target@example.com", "Target"),
            )
            .with_root("r-target");
            let target = TargetOrganization::load(Arc::new(directory), TargetOptions::default(), Span::none())
                .await
                .unwrap();
            target.move_accounts(&accounts, &AutoConfirm).await.unwrap()
        });

        prop_assert!(report.placed.is_empty());
        prop_assert!(report.declined.is_empty());
        prop_assert!(report.failed.is_empty());
        prop_assert!(journal.mutating_calls().is_empty());
    }
}
