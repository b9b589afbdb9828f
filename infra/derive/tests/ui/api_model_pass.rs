use parley_derive::api_model;

#[api_model]
pub struct CreatePostRequest {
    pub post_title: String,
    pub closed: bool,
}

fn main() {
    let parsed: CreatePostRequest =
        serde_json::from_str(r#"{"postTitle":"hello","closed":true}"#).unwrap();
    assert_eq!(parsed.post_title, "hello");
    assert!(parsed.closed);

    let rejected = serde_json::from_str::<CreatePostRequest>(
        r#"{"postTitle":"hello","closed":true,"extra":1}"#,
    );
    assert!(rejected.is_err());
}
