//! 파이프라인 trait -- 모듈 확장 포인트 정의

use crate::types::{Category, ClassifiedEvent};

/// 로그 라인 분류기 trait
///
/// 새로운 분류 방식을 추가하려면 이 trait을 구현합니다.
/// 매칭되지 않는 라인은 에러가 아니라 `None`입니다.
pub trait Classifier: Send + Sync {
    /// 분류기 이름
    fn name(&self) -> &str;

    /// 한 라인을 주어진 카테고리의 규칙으로 분류합니다.
    fn classify(&self, line: &str, category: Category) -> Option<ClassifiedEvent>;

    /// 여러 카테고리에 대해 분류하고 매칭된 결과만 모읍니다.
    fn classify_all(&self, line: &str, categories: &[Category]) -> Vec<ClassifiedEvent> {
        categories
            .iter()
            .filter_map(|category| self.classify(line, *category))
            .collect()
    }
}
