// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use tokio::sync::Semaphore;

use super::*;

#[tokio::test]
async fn admits_when_slots_available() {
    let sem = Arc::new(Semaphore::new(1));
    let permit = try_admit(&sem).await;
    assert!(permit.is_some());
}

#[tokio::test]
async fn reports_unavailable_when_exhausted() {
    let sem = Arc::new(Semaphore::new(1));
    let _held = try_admit(&sem).await.unwrap();
    let second = try_admit(&sem).await;
    assert!(second.is_none());
}

#[tokio::test]
async fn releasing_a_permit_frees_a_slot() {
    let sem = Arc::new(Semaphore::new(1));
    let held = try_admit(&sem).await.unwrap();
    drop(held);
    let second = try_admit(&sem).await;
    assert!(second.is_some());
}
