//! Integration tests for the chain cache.

use alloy_primitives::{Address, B256, Bytes, U256, address, hex};
use meter_cache::{
    Account, Auction, Block, BlockHead, BloomFilter, CacheConfig, Candidate, ChainCache, Code,
    HeadBloom, Receipt, ReceiptMeta, Revision, TiedKey, Transaction, TxMeta,
};
use rstest::*;
use std::{
    num::NonZeroUsize,
    sync::atomic::{AtomicUsize, Ordering},
};

const ALICE: Address = address!("0x7567d83b7b8d80addcb281a71d54fc7b3364ffed");
const BOB: Address = address!("0x0205c2d862ca051010698b69b54278cbaf945c0b");

/// Error returned by fetches in these tests.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FetchError(&'static str);

/// Counts fetch invocations.
#[derive(Debug, Default)]
struct Calls(AtomicUsize);

impl Calls {
    fn record(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Id of block `number` on branch `fork`.
fn id(number: u64, fork: u8) -> B256 {
    let mut id = B256::ZERO;
    id[..8].copy_from_slice(&number.to_be_bytes());
    id[31] = fork;
    id
}

/// Head of block `number` on branch `fork`, built on its parent from branch `parent_fork`.
fn head(number: u64, fork: u8, parent_fork: u8) -> BlockHead {
    BlockHead::new(
        id(number, fork),
        number,
        id(number.saturating_sub(1), parent_fork),
        1_000 + number * 10,
        0,
    )
}

fn trunk(number: u64) -> BlockHead {
    head(number, 0, 0)
}

fn block(head: &BlockHead) -> Block {
    Block {
        id: head.id,
        number: head.number,
        parent_id: head.parent_id,
        timestamp: head.timestamp,
        is_trunk: true,
        ..Default::default()
    }
}

fn tx(id: B256, block: &BlockHead) -> Transaction {
    Transaction {
        id,
        meta: TxMeta {
            block_id: block.id,
            block_number: block.number,
            block_timestamp: block.timestamp,
        },
        ..Default::default()
    }
}

fn receipt(id: B256, block: &BlockHead) -> Receipt {
    Receipt {
        gas_used: 21_000,
        meta: ReceiptMeta {
            block_id: block.id,
            block_number: block.number,
            block_timestamp: block.timestamp,
            tx_id: id,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn account(balance: u64) -> Account {
    Account { balance: U256::from(balance), energy: U256::from(1), ..Default::default() }
}

/// A bloom announcing that a block touched exactly `touched`.
fn bloom_over(touched: &[&[u8]]) -> HeadBloom {
    let mut filter = BloomFilter::new(8);
    for item in touched {
        filter.insert_trimmed(item);
    }
    HeadBloom::new(format!("0x{}", hex::encode(filter.bits())), 8)
}

async fn extend(cache: &ChainCache, numbers: std::ops::RangeInclusive<u64>) {
    for n in numbers {
        cache.handle_new_block(trunk(n), None, None).await;
    }
}

#[fixture]
fn cache() -> ChainCache {
    ChainCache::default()
}

#[fixture]
fn small_cache() -> ChainCache {
    let window_len = NonZeroUsize::new(3).unwrap();
    ChainCache::new(CacheConfig { window_len, ..Default::default() })
}

#[rstest]
#[tokio::test]
async fn test_cache_initialization(cache: ChainCache) {
    assert!(cache.head().await.is_none());

    let stats = cache.stats().await;
    assert_eq!(stats.window_len, 0);
    assert_eq!(stats.window_capacity, 12);
    assert_eq!(stats.irreversible_blocks, 0);
    assert_eq!(stats.irreversible_txs, 0);
}

#[rstest]
#[tokio::test]
async fn test_fork_rollback_discards_forked_slot(cache: ChainCache) {
    extend(&cache, 1..=3).await;
    let calls = &Calls::default();
    let tx_id = B256::repeat_byte(0x11);

    // cache a transaction and an account only under block C (#3)
    cache
        .get_tx(tx_id, move || async move {
            calls.record();
            Ok::<_, FetchError>(Some(tx(tx_id, &trunk(3))))
        })
        .await
        .unwrap();
    cache
        .get_account(ALICE, Revision::Number(3), move || async move {
            calls.record();
            Ok::<_, FetchError>(account(5))
        })
        .await
        .unwrap();
    assert_eq!(calls.count(), 2);

    // D is built on B
    let d = head(3, 1, 0);
    cache.handle_new_block(d, None, None).await;

    assert_eq!(cache.head().await, Some(d));
    assert_eq!(cache.window_len().await, 3);

    cache
        .get_tx(tx_id, move || async move {
            calls.record();
            Ok::<_, FetchError>(None)
        })
        .await
        .unwrap();
    cache
        .get_account(ALICE, Revision::Number(3), move || async move {
            calls.record();
            Ok::<_, FetchError>(account(6))
        })
        .await
        .unwrap();
    assert_eq!(calls.count(), 4);
}

#[rstest]
#[tokio::test]
async fn test_duplicate_head_is_ignored(cache: ChainCache) {
    extend(&cache, 1..=2).await;
    let calls = &Calls::default();
    let tx_id = B256::repeat_byte(0x22);
    let fetch = move || async move {
        calls.record();
        Ok::<_, FetchError>(Some(tx(tx_id, &trunk(2))))
    };

    cache.get_tx(tx_id, fetch).await.unwrap();
    cache.handle_new_block(trunk(2), None, None).await;

    assert_eq!(cache.window_len().await, 2);
    assert_eq!(cache.head().await, Some(trunk(2)));
    assert!(cache.get_tx(tx_id, fetch).await.unwrap().is_some());
    assert_eq!(calls.count(), 1);
}

#[rstest]
#[tokio::test]
async fn test_head_moving_back_keeps_ancestor_state(cache: ChainCache) {
    extend(&cache, 1..=3).await;
    let calls = &Calls::default();
    let fetch = move || async move {
        calls.record();
        Ok::<_, FetchError>(account(10))
    };

    cache.get_account(ALICE, Revision::Number(2), fetch).await.unwrap();
    cache.handle_new_block(trunk(2), None, None).await;

    assert_eq!(cache.head().await, Some(trunk(2)));
    assert_eq!(cache.window_len().await, 2);
    cache.get_account(ALICE, Revision::Number(2), fetch).await.unwrap();
    assert_eq!(calls.count(), 1);
}

#[rstest]
#[tokio::test]
async fn test_window_bound_moves_slots_to_irreversible(small_cache: ChainCache) {
    let cache = small_cache;
    for n in 1..=3 {
        let h = trunk(n);
        cache.handle_new_block(h, None, Some(block(&h))).await;
        let tx_id = B256::with_last_byte(n as u8);
        cache
            .get_tx(tx_id, move || async move { Ok::<_, FetchError>(Some(tx(tx_id, &h))) })
            .await
            .unwrap();
        let fetch = move || async move { Ok::<_, FetchError>(Some(receipt(tx_id, &h))) };
        cache.get_receipt(tx_id, fetch).await.unwrap();
    }
    extend(&cache, 4..=6).await;

    let stats = cache.stats().await;
    assert_eq!(stats.window_len, 3);
    assert_eq!(stats.head, Some(trunk(6)));
    assert_eq!(stats.irreversible_blocks, 3);
    assert_eq!(stats.irreversible_block_numbers, 3);
    assert_eq!(stats.irreversible_txs, 3);
    assert_eq!(stats.irreversible_receipts, 3);

    for n in 1..=3u64 {
        let tx_id = B256::with_last_byte(n as u8);
        let found = cache.get_tx(tx_id, || async { Err(FetchError("unexpected")) }).await;
        assert_eq!(found.unwrap().unwrap().meta.block_number, n);
        let found = cache.get_receipt(tx_id, || async { Err(FetchError("unexpected")) }).await;
        assert_eq!(found.unwrap().unwrap().meta.tx_id, tx_id);
        let found =
            cache.get_block(Revision::Number(n), || async { Err(FetchError("unexpected")) }).await;
        assert_eq!(found.unwrap().unwrap().id, trunk(n).id);
    }
}

#[rstest]
#[tokio::test]
async fn test_bloom_true_negative_skips_fetch(cache: ChainCache) {
    cache.handle_new_block(trunk(1), None, None).await;
    let calls = &Calls::default();
    let captured = cache
        .get_account(ALICE, Revision::Number(1), move || async move {
            calls.record();
            Ok::<_, FetchError>(account(1_000_000_000_000_000_000))
        })
        .await
        .unwrap();

    // block 2 only touched BOB
    cache.handle_new_block(trunk(2), Some(&bloom_over(&[BOB.as_slice()])), None).await;
    let projected = cache
        .get_account(ALICE, Revision::Number(2), move || async move {
            calls.record();
            Ok::<_, FetchError>(Account::default())
        })
        .await
        .unwrap();

    assert_eq!(calls.count(), 1);
    assert_eq!(projected.balance, captured.balance);
    // ten seconds of accrual on one whole token
    assert_eq!(projected.energy, captured.energy + U256::from(50_000_000_000u64));
}

#[rstest]
#[tokio::test]
async fn test_bloom_hit_forces_fetch(cache: ChainCache) {
    cache.handle_new_block(trunk(1), None, None).await;
    let calls = &Calls::default();
    let fetch = move || async move {
        calls.record();
        Ok::<_, FetchError>(account(7))
    };

    cache.get_account(ALICE, Revision::Number(1), fetch).await.unwrap();
    cache.handle_new_block(trunk(2), Some(&bloom_over(&[ALICE.as_slice()])), None).await;
    cache.get_account(ALICE, Revision::Number(2), fetch).await.unwrap();
    assert_eq!(calls.count(), 2);

    // the fresh value now lives at block 2
    cache.get_account(ALICE, Revision::Number(2), fetch).await.unwrap();
    assert_eq!(calls.count(), 2);
}

#[rstest]
#[tokio::test]
async fn test_missing_bloom_stops_walk(cache: ChainCache) {
    extend(&cache, 1..=2).await;
    let calls = &Calls::default();
    let fetch = move || async move {
        calls.record();
        Ok::<_, FetchError>(account(7))
    };

    cache.get_account(ALICE, Revision::Number(1), fetch).await.unwrap();
    cache.get_account(ALICE, Revision::Number(2), fetch).await.unwrap();
    assert_eq!(calls.count(), 2);
}

#[rstest]
#[tokio::test]
async fn test_hit_is_copied_forward(small_cache: ChainCache) {
    let cache = small_cache;
    cache.handle_new_block(trunk(1), None, None).await;
    let calls = &Calls::default();
    let fetch = move || async move {
        calls.record();
        Ok::<_, FetchError>(Code { code: Bytes::from_static(&[0x60, 0x80]) })
    };
    let key = TiedKey::Code(ALICE);
    let ties = [Bytes::copy_from_slice(ALICE.as_slice())];

    cache.get_tied(key, Revision::Number(1), fetch, Some(&ties)).await.unwrap();
    cache.handle_new_block(trunk(2), Some(&bloom_over(&[BOB.as_slice()])), None).await;
    let code = cache.get_tied(key, Revision::Number(2), fetch, Some(&ties)).await.unwrap();
    assert_eq!(code.code.len(), 2);

    // block 1 leaves the window, so only the copy at block 2 can answer
    extend(&cache, 3..=4).await;
    assert_eq!(cache.stats().await.window_len, 3);
    cache.get_tied(key, Revision::Number(2), fetch, Some(&ties)).await.unwrap();
    cache.get_tied(key, Revision::Id(trunk(2).id), fetch, Some(&ties)).await.unwrap();
    assert_eq!(calls.count(), 1);
}

#[rstest]
#[tokio::test]
async fn test_empty_tie_list_is_sticky(cache: ChainCache) {
    extend(&cache, 1..=2).await;
    let calls = &Calls::default();
    let fetch = move || async move {
        calls.record();
        Ok::<_, FetchError>(Code::default())
    };
    let key = TiedKey::Explain(B256::repeat_byte(0xee));

    cache.get_tied(key, Revision::Number(2), fetch, Some(&[])).await.unwrap();
    cache.get_tied(key, Revision::Number(2), fetch, Some(&[])).await.unwrap();
    assert_eq!(calls.count(), 1);
}

#[rstest]
#[tokio::test]
async fn test_empty_tie_list_walks_past_bloomed_blocks(cache: ChainCache) {
    cache.handle_new_block(trunk(1), None, None).await;
    let calls = &Calls::default();
    let fetch = move || async move {
        calls.record();
        Ok::<_, FetchError>(Code::default())
    };
    let key = TiedKey::Explain(B256::repeat_byte(0xee));

    cache.get_tied(key, Revision::Number(1), fetch, Some(&[])).await.unwrap();
    cache.handle_new_block(trunk(2), Some(&bloom_over(&[ALICE.as_slice()])), None).await;
    cache.get_tied(key, Revision::Number(2), fetch, Some(&[])).await.unwrap();
    assert_eq!(calls.count(), 1);

    // without a tie list nothing older than the revision is trusted
    let other = TiedKey::Explain(B256::repeat_byte(0xdd));
    cache.get_tied(other, Revision::Number(1), fetch, None).await.unwrap();
    cache.get_tied(other, Revision::Number(2), fetch, None).await.unwrap();
    assert_eq!(calls.count(), 3);
}

#[rstest]
#[tokio::test]
async fn test_irreversible_block_is_fetched_once(small_cache: ChainCache) {
    let cache = small_cache;
    extend(&cache, 1..=10).await;
    let calls = &Calls::default();
    let fetch = move || async move {
        calls.record();
        Ok::<_, FetchError>(Some(block(&trunk(2))))
    };

    for _ in 0..3 {
        let found = cache.get_block(Revision::Number(2), fetch).await.unwrap();
        assert_eq!(found.unwrap().number, 2);
    }
    cache.get_block(Revision::Id(trunk(2).id), fetch).await.unwrap();
    assert_eq!(calls.count(), 1);
}

#[rstest]
#[tokio::test]
async fn test_fetch_errors_propagate(cache: ChainCache) {
    extend(&cache, 1..=2).await;
    let fail = || async { Err::<Option<Block>, _>(FetchError("boom")) };
    assert_eq!(cache.get_block(Revision::Number(1), fail).await, Err(FetchError("boom")));

    let fail = || async { Err::<Account, _>(FetchError("boom")) };
    assert_eq!(
        cache.get_account(ALICE, Revision::Number(2), fail).await,
        Err(FetchError("boom"))
    );

    // a failed fetch caches nothing
    let calls = &Calls::default();
    let fetch = move || async move {
        calls.record();
        Ok::<_, FetchError>(account(1))
    };
    cache.get_account(ALICE, Revision::Number(2), fetch).await.unwrap();
    assert_eq!(calls.count(), 1);
}

#[rstest]
#[tokio::test]
async fn test_not_found_is_not_cached(cache: ChainCache) {
    extend(&cache, 1..=2).await;
    let calls = &Calls::default();
    let fetch = move || async move {
        calls.record();
        Ok::<Option<Block>, FetchError>(None)
    };

    assert!(cache.get_block(Revision::Number(2), fetch).await.unwrap().is_none());
    assert!(cache.get_block(Revision::Number(2), fetch).await.unwrap().is_none());
    assert_eq!(calls.count(), 2);
}

#[rstest]
#[tokio::test]
async fn test_rollback_during_fetch_drops_result(cache: ChainCache) {
    extend(&cache, 1..=3).await;
    let cache = &cache;
    let calls = &Calls::default();
    let tx_id = B256::repeat_byte(0x33);

    // the node reorganizes away from block 3 while the fetch is in flight
    let found = cache
        .get_tx(tx_id, move || async move {
            calls.record();
            cache.handle_new_block(head(3, 1, 0), None, None).await;
            Ok::<_, FetchError>(Some(tx(tx_id, &trunk(3))))
        })
        .await
        .unwrap();
    assert!(found.is_some());

    cache
        .get_tx(tx_id, move || async move {
            calls.record();
            Ok::<_, FetchError>(None)
        })
        .await
        .unwrap();
    assert_eq!(calls.count(), 2);
}

#[rstest]
#[tokio::test]
async fn test_summary_watermarks_are_independent(cache: ChainCache) {
    cache.handle_new_block(trunk(1), None, None).await;
    let calls = &Calls::default();
    let candidates = move || async move {
        calls.record();
        Ok::<_, FetchError>(vec![Candidate { name: "alpha".into(), ..Default::default() }])
    };
    let buckets = move || async move {
        calls.record();
        Ok::<_, FetchError>(Vec::new())
    };

    cache.get_candidates(candidates).await.unwrap();
    cache.get_candidates(candidates).await.unwrap();
    assert_eq!(calls.count(), 1);

    // another summary has its own watermark
    cache.get_buckets(buckets).await.unwrap();
    cache.get_buckets(buckets).await.unwrap();
    assert_eq!(calls.count(), 2);

    cache.handle_new_block(trunk(2), None, None).await;
    let refreshed = cache.get_candidates(candidates).await.unwrap();
    assert_eq!(refreshed[0].name, "alpha");
    assert_eq!(calls.count(), 3);
}

#[rstest]
#[tokio::test]
async fn test_summary_on_empty_window_always_fetches(cache: ChainCache) {
    let calls = &Calls::default();
    let fetch = move || async move {
        calls.record();
        Ok::<_, FetchError>(Vec::new())
    };

    cache.get_stakeholders(fetch).await.unwrap();
    cache.get_stakeholders(fetch).await.unwrap();
    assert_eq!(calls.count(), 2);
}

#[rstest]
#[tokio::test]
async fn test_absent_auction_is_not_cached(cache: ChainCache) {
    cache.handle_new_block(trunk(1), None, None).await;
    let calls = &Calls::default();
    let none = move || async move {
        calls.record();
        Ok::<Option<Auction>, FetchError>(None)
    };
    let some = move || async move {
        calls.record();
        Ok::<_, FetchError>(Some(Auction { start_height: 1, ..Default::default() }))
    };

    assert!(cache.get_auction(none).await.unwrap().is_none());
    assert!(cache.get_auction(some).await.unwrap().is_some());
    assert!(cache.get_auction(none).await.unwrap().is_some());
    assert_eq!(calls.count(), 2);
}
