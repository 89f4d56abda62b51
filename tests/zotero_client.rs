use dlab_biblio::error::Error;
use dlab_biblio::updater;
use dlab_biblio::{
    flags, Config, FlagUpdateOutcome, HalClient, Importer, LibraryRef, Stage, WriteOutcome,
    ZoteroClient,
};
use mockito::Matcher;
use serde_json::json;

fn config(server: &mockito::Server) -> Config {
    Config::new("secret", LibraryRef::group("4242"))
        .with_zotero_url(server.url())
        .with_catalog_url(format!("{}/search/", server.url()))
        .with_rate_limit(1000.0)
}

fn item_body(version: u64, extra: &str) -> String {
    json!({
        "key": "ABCD2345",
        "version": version,
        "data": {
            "key": "ABCD2345",
            "version": version,
            "itemType": "book",
            "title": "Rivers of Gascony",
            "extra": extra
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_fetch_item_sends_auth_headers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/groups/4242/items/ABCD2345")
        .match_header("zotero-api-key", "secret")
        .match_header("zotero-api-version", "3")
        .with_status(200)
        .with_header("last-modified-version", "12")
        .with_body(item_body(12, "note"))
        .create_async()
        .await;

    let client = ZoteroClient::new(&config(&server)).unwrap();
    let item = client.fetch_item("ABCD2345").await.unwrap();
    assert_eq!(item.version, Some(12));
    assert_eq!(item.extra(), "note");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_item_unknown_key_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/groups/4242/items/MISSING2")
        .with_status(404)
        .create_async()
        .await;

    let client = ZoteroClient::new(&config(&server)).unwrap();
    let err = client.fetch_item("MISSING2").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_malformed_key_never_reaches_the_server() {
    let mut server = mockito::Server::new_async().await;
    let any = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = ZoteroClient::new(&config(&server)).unwrap();
    let err = updater::update_flags(&client, "../../../users/1/items/X", [("hal_create", "yes")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let err = client
        .replace_item("ABCD234?", &serde_json::Map::new(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    any.assert_async().await;
}

#[tokio::test]
async fn test_replace_item_is_conditional() {
    let mut server = mockito::Server::new_async().await;
    let applied = server
        .mock("PUT", "/groups/4242/items/ABCD2345")
        .match_header("if-unmodified-since-version", "12")
        .with_status(204)
        .with_header("last-modified-version", "13")
        .create_async()
        .await;
    let stale = server
        .mock("PUT", "/groups/4242/items/ABCD2345")
        .match_header("if-unmodified-since-version", "11")
        .with_status(412)
        .create_async()
        .await;

    let client = ZoteroClient::new(&config(&server)).unwrap();
    let data = serde_json::Map::new();

    let outcome = client.replace_item("ABCD2345", &data, 12).await.unwrap();
    assert_eq!(outcome, WriteOutcome::Applied { version: Some(13) });
    let outcome = client.replace_item("ABCD2345", &data, 11).await.unwrap();
    assert_eq!(outcome, WriteOutcome::Conflict);

    applied.assert_async().await;
    stale.assert_async().await;
}

#[tokio::test]
async fn test_update_flags_round_trip() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/groups/4242/items/ABCD2345")
        .with_status(200)
        .with_body(item_body(12, "note\n\n[DLAB]\nhal_create: yes\n[/DLAB]"))
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/groups/4242/items/ABCD2345")
        .match_header("if-unmodified-since-version", "12")
        .match_body(Matcher::PartialJson(json!({
            "title": "Rivers of Gascony",
            "extra": "note\n\n[DLAB]\nhal_create: yes\ncomms_publish: no\n[/DLAB]"
        })))
        .with_status(204)
        .create_async()
        .await;

    let client = ZoteroClient::new(&config(&server)).unwrap();
    let outcome = updater::update_flags(&client, "ABCD2345", [("comms_publish", "no")])
        .await
        .unwrap();
    assert_eq!(outcome, FlagUpdateOutcome::Done);
    put.assert_async().await;
}

#[tokio::test]
async fn test_update_flags_conflict_on_412() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/groups/4242/items/ABCD2345")
        .with_status(200)
        .with_body(item_body(5, ""))
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/groups/4242/items/ABCD2345")
        .with_status(412)
        .expect(1)
        .create_async()
        .await;

    let client = ZoteroClient::new(&config(&server)).unwrap();
    let outcome = updater::update_flags(&client, "ABCD2345", [("hal_create", "yes")])
        .await
        .unwrap();
    assert_eq!(outcome, FlagUpdateOutcome::Conflict { version: 5 });
    put.assert_async().await;
}

#[tokio::test]
async fn test_import_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search/")
        .match_query(Matcher::UrlEncoded("q".into(), "halId_s:\"hal-1\"".into()))
        .with_status(200)
        .with_body(
            r#"{"response": {"numFound": 1, "docs": [{
                "halId_s": "hal-1",
                "docType_s": "OUV",
                "title_s": ["Rivers of Gascony"],
                "authLastName_s": ["Ruiz"],
                "authFirstName_s": ["Ana"],
                "producedDateY_i": 2019,
                "publisher_s": ["Presses du Sud"],
                "city_s": ["Pau"]
            }]}}"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/search/")
        .match_query(Matcher::UrlEncoded("q".into(), "halId_s:\"hal-2\"".into()))
        .with_status(200)
        .with_body(r#"{"response": {"numFound": 0, "docs": []}}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/search/")
        .match_query(Matcher::UrlEncoded("q".into(), "halId_s:\"hal-3\"".into()))
        .with_status(503)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/groups/4242/items")
        .match_body(Matcher::PartialJson(json!([{
            "itemType": "book",
            "title": "Rivers of Gascony",
            "publisher": "Presses du Sud",
            "place": "Pau",
            "collections": ["COLL0001"]
        }])))
        .with_status(200)
        .with_body(r#"{"successful": {"0": {"key": "NEWKEY01"}}, "unsuccessful": {}}"#)
        .expect(1)
        .create_async()
        .await;

    let config = config(&server).with_collection("COLL0001");
    let importer = Importer::<HalClient, ZoteroClient>::from_config(&config).unwrap();
    let report = importer.run(&["hal-1", "hal-2", "hal-1", "hal-3"]).await.unwrap();

    assert_eq!(report.requested, 3);
    assert_eq!(report.fetched, 1);
    assert_eq!(report.importable, 1);
    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.failures, 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].subject_id, "hal-3");
    assert_eq!(report.errors[0].stage, Stage::Fetch);
    assert!(report.errors[0].message.starts_with("HTTP 503"));
    create.assert_async().await;
}

#[test]
fn test_merged_extra_matches_put_body() {
    let merged = flags::merge(
        "note\n\n[DLAB]\nhal_create: yes\n[/DLAB]",
        [("comms_publish", "no")],
    );
    assert_eq!(
        merged,
        "note\n\n[DLAB]\nhal_create: yes\ncomms_publish: no\n[/DLAB]"
    );
}
