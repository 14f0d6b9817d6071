//! 고유 식별자 생성
//!
//! 병렬로 실행되는 사이클끼리 클라우드 리소스 이름이 충돌하지 않도록
//! 짧은 무작위 접미사를 생성합니다. 스레드 로컬 RNG를 사용하므로
//! 공유 카운터나 락 없이 어느 태스크에서든 호출할 수 있습니다.

use rand::Rng;

/// 접미사 길이
pub const SUFFIX_LEN: usize = 6;

/// 접미사 문자 집합
///
/// 소문자와 숫자만 사용하며 헷갈리기 쉬운 `0`, `1`, `l`, `o`는 제외합니다.
/// S3 버킷 이름과 IAM 이름 규칙을 모두 만족합니다.
const SUFFIX_ALPHABET: &[u8] = b"23456789abcdefghijkmnpqrstuvwxyz";

/// 새 고유 접미사를 생성합니다.
pub fn new_unique_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// `"{prefix}-{suffix}"` 형태의 고유 이름을 생성합니다.
///
/// 예: `unique_name("test-cloudtrail")` → `test-cloudtrail-k3x9qa`
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", new_unique_suffix())
}
