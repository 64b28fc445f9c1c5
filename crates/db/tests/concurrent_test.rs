//! Concurrent approval stress tests.
//!
//! Many requests funded by the same envelopes are approved in parallel;
//! the envelopes must end up committed by exactly the sum of the requests.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

use procura_core::approval::{ApprovalPlanner, ApproverRole, Urgency};
use procura_core::budget::{BudgetEvaluator, EnvelopeKind};
use procura_core::procurement::{CreateRequestInput, RequestStatus};
use procura_shared::types::BudgetId;
use procura_db::{
    ApproverAssignment, ApproverRegistry, BudgetRepository, CreateBudgetInput,
    ProcurementRepository, UpdateBudgetInput,
};

const REQUESTS: usize = 64;

fn setup() -> (ProcurementRepository, BudgetRepository, BudgetId) {
    let budgets = BudgetRepository::new();
    let record = budgets
        .create(CreateBudgetInput {
            name: "Operations".to_string(),
            kind: EnvelopeKind::Department,
            owner: "ops".to_string(),
            total_budget: dec!(1000000),
            committed_amount: Decimal::ZERO,
            spent_amount: Decimal::ZERO,
        })
        .expect("budget");

    let approvers = ApproverRegistry::new();
    approvers.assign(ApproverAssignment {
        role: ApproverRole::DepartmentManager,
        department: None,
        approver_id: "dm".to_string(),
    });

    let repo = ProcurementRepository::new(
        budgets.clone(),
        approvers,
        ApprovalPlanner::default(),
        BudgetEvaluator::default(),
    );
    (repo, budgets, record.id)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_final_approvals_commit_exactly_once() {
    let (repo, budgets, budget_id) = setup();

    let mut ids = Vec::with_capacity(REQUESTS);
    for i in 0..REQUESTS {
        let request = repo
            .create(CreateRequestInput {
                title: format!("Supplies #{i}"),
                description: String::new(),
                department: "ops".to_string(),
                project: None,
                urgency: Urgency::Medium,
                total_amount: dec!(1500),
                requested_by: "clerk".to_string(),
                department_budget_id: Some(budget_id),
                project_budget_id: None,
            })
            .expect("create");
        repo.submit(request.id).expect("submit");
        ids.push(request.id);
    }

    let barrier = Arc::new(Barrier::new(REQUESTS));
    let mut handles = Vec::with_capacity(REQUESTS);
    for id in ids.iter().copied() {
        let repo = repo.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            tokio::task::spawn_blocking(move || repo.approve(id, 0, "dm", None))
                .await
                .expect("join")
        }));
    }

    for handle in handles {
        let result = handle.await.expect("task").expect("approve");
        assert_eq!(result.request.status, RequestStatus::Approved);
    }

    let envelope = budgets.envelope(budget_id).expect("envelope");
    assert_eq!(envelope.committed_amount, dec!(1500) * Decimal::from(REQUESTS));
    assert_eq!(
        envelope.available_amount,
        dec!(1000000) - dec!(1500) * Decimal::from(REQUESTS)
    );
    assert!(envelope.is_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_approvals_on_one_request_decide_once() {
    let (repo, budgets, budget_id) = setup();
    let request = repo
        .create(CreateRequestInput {
            title: "Forklift".to_string(),
            description: String::new(),
            department: "ops".to_string(),
            project: None,
            urgency: Urgency::High,
            total_amount: dec!(9000),
            requested_by: "clerk".to_string(),
            department_budget_id: Some(budget_id),
            project_budget_id: None,
        })
        .expect("create");
    repo.submit(request.id).expect("submit");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = repo.clone();
        let id = request.id;
        handles.push(tokio::task::spawn_blocking(move || {
            repo.approve(id, 0, "dm", None).is_ok()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.expect("join") {
            successes += 1;
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(
        budgets.envelope(budget_id).expect("envelope").committed_amount,
        dec!(9000)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_budget_edits_do_not_lose_commitments() {
    let (repo, budgets, budget_id) = setup();

    let mut ids = Vec::with_capacity(REQUESTS);
    for i in 0..REQUESTS {
        let request = repo
            .create(CreateRequestInput {
                title: format!("Tooling #{i}"),
                description: String::new(),
                department: "ops".to_string(),
                project: None,
                urgency: Urgency::Low,
                total_amount: dec!(1000),
                requested_by: "clerk".to_string(),
                department_budget_id: Some(budget_id),
                project_budget_id: None,
            })
            .expect("create");
        repo.submit(request.id).expect("submit");
        ids.push(request.id);
    }

    let mut handles = Vec::with_capacity(REQUESTS * 2);
    for (i, id) in ids.iter().copied().enumerate() {
        let repo = repo.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            repo.approve(id, 0, "dm", None).is_ok()
        }));
        let budgets = budgets.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            budgets
                .update(
                    budget_id,
                    UpdateBudgetInput {
                        spent_amount: Some(Decimal::from(i)),
                        ..UpdateBudgetInput::default()
                    },
                )
                .is_ok()
        }));
    }

    for handle in handles {
        assert!(handle.await.expect("join"));
    }

    let envelope = budgets.envelope(budget_id).expect("envelope");
    assert_eq!(envelope.committed_amount, dec!(1000) * Decimal::from(REQUESTS));
    assert!(envelope.is_consistent());
}
