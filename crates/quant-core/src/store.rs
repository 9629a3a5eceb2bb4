//! 키-레코드 저장소.
//!
//! 완료된 실행 결과(백테스트 리포트, 스캔 리포트 등)를 프로세스 전역
//! 싱글턴 없이 관리하기 위한 명시적 저장소입니다. 삽입/갱신/삭제 시점은
//! 모두 호출자가 결정합니다.
//!
//! # 스레드 안전성
//!
//! 내부적으로 `tokio::sync::RwLock`을 사용하여 다중 읽기 / 단일 쓰기를
//! 보장합니다.

use std::collections::HashMap;

use tokio::sync::RwLock;

/// 인메모리 키-레코드 저장소.
pub struct RecordStore<T> {
    records: RwLock<HashMap<String, T>>,
}

impl<T: Clone + Send + Sync> RecordStore<T> {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// 레코드를 저장합니다. 같은 키의 기존 레코드를 반환합니다.
    pub async fn insert(&self, key: impl Into<String>, record: T) -> Option<T> {
        let mut guard = self.records.write().await;
        guard.insert(key.into(), record)
    }

    /// 레코드를 조회합니다.
    pub async fn get(&self, key: &str) -> Option<T> {
        let guard = self.records.read().await;
        guard.get(key).cloned()
    }

    /// 키 존재 여부를 확인합니다.
    pub async fn contains(&self, key: &str) -> bool {
        let guard = self.records.read().await;
        guard.contains_key(key)
    }

    /// 레코드를 제거하고 반환합니다.
    pub async fn evict(&self, key: &str) -> Option<T> {
        let mut guard = self.records.write().await;
        guard.remove(key)
    }

    /// 저장된 키 목록을 반환합니다.
    pub async fn keys(&self) -> Vec<String> {
        let guard = self.records.read().await;
        guard.keys().cloned().collect()
    }

    /// 레코드 수.
    pub async fn len(&self) -> usize {
        let guard = self.records.read().await;
        guard.len()
    }

    /// 비어 있는지 확인.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// 모든 레코드를 제거합니다.
    pub async fn clear(&self) {
        let mut guard = self.records.write().await;
        guard.clear();
    }
}

impl<T: Clone + Send + Sync> Default for RecordStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
