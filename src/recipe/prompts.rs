//! Prompt templates, one per dietary target
//!
//! Every template asks for a bare JSON object so the reply can be cut out
//! between the first `{` and the last `}`.

use crate::nutrition::NutritionRecord;
use crate::session::{Profile, Target};

/// Calorie ceiling per serving written into the prompt, when the target has one
pub fn calorie_ceiling(target: Target) -> Option<u32> {
    match target {
        Target::Keto => Some(600),
        Target::Diabetes => Some(500),
        Target::Diet => Some(400),
        _ => None,
    }
}

fn join_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(", ")
    }
}

fn extra_str<'a>(profile: &'a Profile, key: &str, fallback: &'a str) -> &'a str {
    profile
        .extra
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(fallback)
}

fn preference<'a>(profile: &'a Profile, key: &str, fallback: &'a str) -> &'a str {
    profile
        .extra
        .get("preferences")
        .and_then(|p| p.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or(fallback)
}

/// Build the generation prompt for `profile`
pub fn build_prompt(profile: &Profile) -> String {
    let allergies = join_or(&profile.allergies, "없음");
    let cooking_level = profile.cooking_level.as_deref().unwrap_or("초급");
    let ceiling = calorie_ceiling(profile.target);

    match profile.target {
        Target::Keto => format!(
            r#"당신은 케토제닉 다이어트 전문 영양사입니다. 다음 조건에 맞는 레시피를 생성해주세요:

사용자 프로필:
- 건강 상태: {health}
- 알레르기: {allergies}
- 요리 실력: {cooking_level}
- 예산: {budget}원
- 인분: {servings}

케토 다이어트 요구사항:
- 탄수화물: 5g 이하
- 지방: 70% 이상
- 단백질: 25% 내외
- 총 칼로리: {calories}kcal 이하

다음 JSON 형식으로만 응답해주세요:
{{
  "recipeName": "레시피명",
  "description": "레시피 설명",
  "cookingTime": 25,
  "difficulty": "easy",
  "servings": {servings},
  "ingredients": [
    {{"name": "아보카도", "amount": "1", "unit": "개"}},
    {{"name": "올리브오일", "amount": "2", "unit": "큰술"}}
  ],
  "instructions": ["1. 아보카도를 반으로 자릅니다.", "2. 올리브오일을 뿌립니다."],
  "ketoNotes": "케토시스 유지 팁"
}}"#,
            health = join_or(&profile.health_conditions, "없음"),
            budget = profile.budget,
            servings = profile.servings,
            calories = ceiling.unwrap_or(600),
        ),
        Target::BabyFood => format!(
            r#"당신은 소아영양 전문가입니다. 안전하고 영양가 있는 이유식 레시피를 생성해주세요:

아기 정보:
- 월령: {age}개월
- 알레르기 이력: {allergies}
- 현재 먹고 있는 음식: {foods}

이유식 안전 기준:
- 월령에 적합한 식재료만 사용
- 질식 위험 없는 크기와 질감
- 소금, 설탕, 꿀 등 첨가물 금지
- 알레르기 유발 가능 식품 주의

다음 JSON 형식으로만 응답해주세요:
{{
  "recipeName": "이유식명",
  "description": "월령별 적합한 이유식",
  "ageAppropriate": "6-8개월",
  "texture": "으깬 형태",
  "cookingTime": 20,
  "difficulty": "easy",
  "servings": 1,
  "ingredients": [
    {{"name": "당근", "amount": "50", "unit": "g"}},
    {{"name": "쌀", "amount": "30", "unit": "g"}}
  ],
  "instructions": ["1. 당근을 삶아 으깹니다.", "2. 쌀죽과 섞어줍니다."],
  "safetyNotes": "질식 위험 주의사항",
  "storageInstructions": "냉장 보관 2일"
}}"#,
            age = profile.baby_age.unwrap_or(6),
            foods = join_or(&profile.current_foods, "기본 이유식"),
        ),
        Target::Diabetes => format!(
            r#"당신은 당뇨병 전문 영양사입니다. 혈당 관리에 도움되는 레시피를 생성해주세요:

환자 정보:
- 당뇨 유형: {kind}
- 혈당 상태: {blood_sugar}
- 복용 약물: {medications}
- 목표 칼로리: {calories}kcal
- 알레르기: {allergies}
- 요리 실력: {cooking_level}

당뇨 식단 원칙:
- 혈당 지수(GI) 55 이하 식품 우선
- 복합 탄수화물 위주
- 식이섬유 풍부한 재료
- 단순당 최소화

다음 JSON 형식으로만 응답해주세요:
{{
  "recipeName": "당뇨 관리 레시피명",
  "description": "혈당 관리에 도움되는 레시피",
  "cookingTime": 30,
  "difficulty": "easy",
  "servings": {servings},
  "ingredients": [
    {{"name": "현미", "amount": "100", "unit": "g"}},
    {{"name": "브로콜리", "amount": "150", "unit": "g"}}
  ],
  "instructions": ["1. 현미를 충분히 불려 삶습니다.", "2. 브로콜리를 찜으로 조리합니다."],
  "glycemicIndex": "낮음",
  "diabeticNotes": "식후 혈당 모니터링 권장"
}}"#,
            kind = profile.diabetes_type.as_deref().unwrap_or("제2형"),
            blood_sugar = profile.blood_sugar.as_deref().unwrap_or("normal"),
            medications = join_or(&profile.medications, "없음"),
            calories = ceiling.unwrap_or(500),
            servings = profile.servings,
        ),
        Target::Diet => format!(
            r#"당신은 다이어트 전문 영양사입니다. 건강한 체중 감량을 위한 레시피를 생성해주세요:

사용자 정보:
- 목표: {goal}
- 목표 칼로리: {calories}kcal
- 알레르기: {allergies}
- 선호 음식: {cuisine}
- 예산: {budget}원

다이어트 원칙:
- 저칼로리 고영양
- 포만감 있는 식이섬유
- 양질의 단백질
- 건강한 지방

다음 JSON 형식으로만 응답해주세요:
{{
  "recipeName": "다이어트 레시피명",
  "description": "건강한 체중 관리 레시피",
  "cookingTime": 25,
  "difficulty": "easy",
  "servings": {servings},
  "ingredients": [
    {{"name": "닭가슴살", "amount": "100", "unit": "g"}},
    {{"name": "양배추", "amount": "200", "unit": "g"}}
  ],
  "instructions": ["1. 닭가슴살을 삶습니다.", "2. 양배추와 함께 샐러드로 만듭니다."],
  "dietTips": "충분한 수분 섭취와 함께 드세요"
}}"#,
            goal = extra_str(profile, "dietGoal", "체중 감량"),
            calories = ceiling.unwrap_or(400),
            cuisine = preference(profile, "cuisine", "한식"),
            budget = profile.budget,
            servings = profile.servings,
        ),
        Target::Fridge => format!(
            r#"당신은 창의적인 요리사입니다. 주어진 재료로 맛있는 레시피를 만들어주세요:

보유 재료:
{available}

추가 구매 가능 재료 (예산 {budget}원):
- 기본 조미료 (소금, 후추, 기름 등)
- 저렴한 부재료

목표:
- 음식물 쓰레기 최소화
- 경제적인 레시피
- 영양 균형 고려

다음 JSON 형식으로만 응답해주세요:
{{
  "recipeName": "냉장고 털기 레시피명",
  "description": "보유 재료 활용 레시피",
  "cookingTime": 20,
  "difficulty": "easy",
  "servings": {servings},
  "ingredients": [
    {{"name": "보유재료1", "amount": "적당량", "unit": "개"}},
    {{"name": "추가재료1", "amount": "1", "unit": "큰술"}}
  ],
  "instructions": ["1. 보유 재료를 손질합니다.", "2. 간단히 조리합니다."],
  "usedIngredients": ["보유 재료 중 사용된 것들"],
  "additionalIngredients": ["추가 구매 필요한 재료들"],
  "estimatedCost": 5000
}}"#,
            available = join_or(&profile.available_ingredients, "기본 재료"),
            budget = profile.additional_budget.unwrap_or(10_000),
            servings = profile.servings,
        ),
        Target::General => format!(
            r#"당신은 전문 요리사입니다. 맛있고 영양가 있는 레시피를 생성해주세요:

사용자 정보:
- 요리 실력: {cooking_level}
- 선호 음식: {cuisine}
- 매운맛 정도: {spicy}
- 알레르기: {allergies}
- 예산: {budget}원

다음 JSON 형식으로만 응답해주세요:
{{
  "recipeName": "일반 레시피명",
  "description": "맛있고 영양가 있는 레시피",
  "cookingTime": 30,
  "difficulty": "medium",
  "servings": {servings},
  "ingredients": [
    {{"name": "재료1", "amount": "1", "unit": "개"}},
    {{"name": "재료2", "amount": "2", "unit": "큰술"}}
  ],
  "instructions": ["1. 재료를 준비합니다.", "2. 조리합니다."],
  "cookingTips": "요리 팁"
}}"#,
            cuisine = preference(profile, "cuisine", "한식"),
            spicy = preference(profile, "spicyLevel", "보통"),
            budget = profile.budget,
            servings = profile.servings,
        ),
    }
}

/// Per-100g reference lines for indexed ingredients, `None` when there are none
pub fn nutrition_reference(records: &[NutritionRecord]) -> Option<String> {
    if records.is_empty() {
        return None;
    }
    let lines: Vec<String> = records
        .iter()
        .map(|r| {
            format!(
                "- {}: 칼로리 {}kcal, 탄수화물 {}g, 단백질 {}g, 지방 {}g",
                r.ingredient_name, r.calories_per_100g, r.carbs, r.protein, r.fat
            )
        })
        .collect();
    Some(lines.join("\n"))
}

/// `build_prompt` followed by nutrition facts from the index as reference data
pub fn build_grounded_prompt(profile: &Profile, references: &[NutritionRecord]) -> String {
    let prompt = build_prompt(profile);
    match nutrition_reference(references) {
        Some(reference) => format!(
            "{prompt}\n\n참고용 영양소 데이터베이스 (100g 기준):\n{reference}\n\n위 수치를 참고해 영양 정보를 계산해주세요."
        ),
        None => prompt,
    }
}
