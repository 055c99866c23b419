/// Column-name abbreviation dictionary, each `_`-separated segment of a
/// column name is expanded through it.
const ABBREVIATIONS: &[(&str, &str)] = &[
    // common nouns
    ("nm", "name"),
    ("dt", "date"),
    ("no", "number"),
    ("cd", "code"),
    ("desc", "description"),
    ("amt", "amount"),
    ("cnt", "count"),
    ("qty", "quantity"),
    ("addr", "address"),
    ("tel", "phone"),
    ("hp", "phone"),
    ("ph", "phone"),
    ("biz", "business"),
    ("pwd", "password"),
    ("passwd", "password"),
    ("pw", "password"),
    ("img", "image"),
    ("file", "file"),
    ("path", "path"),
    ("url", "url"),
    ("ip", "ip"),
    ("zip", "zipcode"),
    ("post", "zipcode"),
    ("msg", "message"),
    ("txt", "text"),
    ("tit", "title"),
    ("subj", "subject"),
    ("doc", "document"),
    ("usr", "user"),
    ("cust", "customer"),
    ("emp", "employee"),
    ("dept", "department"),
    ("grp", "group"),
    ("cat", "category"),
    ("loc", "location"),
    ("lat", "latitude"),
    ("lng", "longitude"),
    ("lon", "longitude"),
    ("geo", "geometry"),
    ("st", "street"),
    ("prov", "province"),
    ("dist", "district"),
    ("bal", "balance"),
    ("calc", "calculation"),
    ("rst", "result"),
    ("rslt", "result"),
    ("std", "standard"),
    ("avg", "average"),
    ("mid", "id"),
    ("uid", "id"),
    ("pid", "id"),
    // verbs / status
    ("reg", "registered"),
    ("mod", "modified"),
    ("del", "deleted"),
    ("cre", "created"),
    ("upd", "updated"),
    ("yn", "yesno"),
    ("stat", "status"),
    ("sts", "status"),
    ("typ", "type"),
    ("kind", "kind"),
    ("val", "value"),
    ("ord", "order"),
    ("seq", "sequence"),
    ("idx", "index"),
    ("bg", "background"),
    ("fg", "foreground"),
    ("brd", "board"),
    ("art", "article"),
    ("auth", "authority"),
    ("is", "yesno"),
    ("use", "yesno"),
    ("flg", "flag"),
];

/// Comment keyword table, first match wins. Keywords cover both English
/// tokens and the Korean vocabulary commonly found in DB comments.
const COMMENT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "phone",
        &["전화", "휴대폰", "연락처", "핸드폰", "mobile", "phone"],
    ),
    ("email", &["이메일", "메일", "email", "mail"]),
    ("address", &["주소", "거주지", "address"]),
    ("zipcode", &["우편", "zip", "postal"]),
    ("name", &["이름", "성명", "name"]),
    ("id", &["아이디", "user_id"]),
    ("password", &["비밀번호", "패스워드", "암호", "password"]),
    ("title", &["제목", "타이틀"]),
    ("description", &["내용", "설명", "desc"]),
    ("date", &["날짜", "일시", "date", "time"]),
    ("price", &["금액", "가격", "단가", "price", "cost"]),
    ("count", &["수량", "개수", "count", "qty"]),
    ("yesno", &["여부", "flag", "yn"]),
    ("country", &["국가", "나라", "country"]),
    ("city", &["도시", "city"]),
    ("ip", &["ip"]),
];

/// Infer a semantic tag for a column: comment keywords first, then the
/// same keywords against the column name, then abbreviation expansion.
pub fn analyze_meaning(col_name: &str, comment: &str) -> String {
    let comment = comment.to_lowercase();
    let col_name = col_name.to_lowercase();

    if let Some(tag) = match_keywords(&comment) {
        return tag;
    }
    if let Some(tag) = match_keywords(&col_name) {
        return tag;
    }

    let decoded: Vec<&str> = col_name
        .split('_')
        .map(|part| {
            ABBREVIATIONS
                .iter()
                .find(|(abbr, _)| *abbr == part)
                .map(|(_, full)| *full)
                .unwrap_or(part)
        })
        .collect();
    decoded.join(" ")
}

fn match_keywords(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    for (tag, keywords) in COMMENT_KEYWORDS {
        if keywords.iter().any(|keyword| text.contains(keyword)) {
            return Some(tag.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_abbreviation_expansion() {
        assert_eq!(analyze_meaning("cust_nm", ""), "customer name");
        assert_eq!(analyze_meaning("reg_dt", ""), "registered date");
        assert_eq!(analyze_meaning("home_addr", ""), "home address");
    }

    #[test]
    fn test_name_keywords_before_abbreviations() {
        assert_eq!(analyze_meaning("user_id", ""), "id");
        assert_eq!(analyze_meaning("use_yn", ""), "yesno");
        assert_eq!(analyze_meaning("zip_code", ""), "zipcode");
    }

    #[test]
    fn test_korean_comment_keywords() {
        assert_eq!(analyze_meaning("x", "고객 전화번호"), "phone");
        assert_eq!(analyze_meaning("x", "배송지 주소"), "address");
        assert_eq!(analyze_meaning("x", "가입 일시"), "date");
        assert_eq!(analyze_meaning("x", "사용 여부"), "yesno");
        assert_eq!(analyze_meaning("x", "판매 단가"), "price");
    }

    #[test]
    fn test_english_comment_keywords() {
        // "email" is checked before "address"
        assert_eq!(analyze_meaning("c1", "customer email address"), "email");
        assert_eq!(analyze_meaning("c2", "unit price"), "price");
    }

    #[test]
    fn test_comment_first_match_wins() {
        // both "mobile" (phone) and "mail" (email) appear, phone is checked first
        assert_eq!(analyze_meaning("c1", "mobile or mail contact"), "phone");
    }

    #[test]
    fn test_unknown_segments_pass_through() {
        assert_eq!(analyze_meaning("warehouse", ""), "warehouse");
        assert_eq!(analyze_meaning("shelf_code_x9", ""), "shelf code x9");
    }
}
