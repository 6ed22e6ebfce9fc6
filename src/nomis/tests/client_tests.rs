//! End-to-end tests of the Nomis client against canned pages

use super::{ROOT, nomis_fetcher, test_config};
use crate::config::MatchPolicy;
use crate::error::LinkerError;
use crate::fetch::StaticFetcher;
use crate::nomis::NomisClient;

#[tokio::test]
async fn test_connect_builds_catalogue() {
    let client = NomisClient::connect(nomis_fetcher(), &test_config(), "key")
        .await
        .unwrap();

    assert_eq!(client.catalogue().len(), 3);
    assert_eq!(client.resolve_dataset("JSA").unwrap().id, "NM_1_1");

    let again = client.build_catalogue().await.unwrap();
    assert_eq!(&again, client.catalogue());
}

#[tokio::test]
async fn test_connect_fails_without_definitions_page() {
    let result = NomisClient::connect(StaticFetcher::new(), &test_config(), "key").await;
    assert!(matches!(result, Err(LinkerError::Http { status: 404, .. })));
}

#[tokio::test]
async fn test_build_url_for_2011_dataset() {
    let client = NomisClient::connect(nomis_fetcher(), &test_config(), "0x01")
        .await
        .unwrap();

    let plan = client.build_url("KS101EW").await.unwrap();
    assert_eq!(plan.dataset_id, "NM_1603_1");
    assert!(plan.url.starts_with(&format!("{}NM_1603_1.data.csv?date=latest", ROOT)));
    assert_eq!(plan.param("geography"), Some("1249902593...1249937345"));
    assert_eq!(plan.param("rural_urban"), Some("0"));
    assert_eq!(plan.param("cell"), Some("0,1,2"));
    assert_eq!(plan.param("measures"), Some("20100"));
    assert_eq!(plan.param("uid"), Some("0x01"));
}

#[tokio::test]
async fn test_build_url_for_2001_dataset() {
    let client = NomisClient::connect(nomis_fetcher(), &test_config(), "key")
        .await
        .unwrap();

    let plan = client.build_url(r"KS101EW.*\(2001\)").await.unwrap();
    assert_eq!(plan.param("geography"), Some("1275068417...1275102794"));
    assert_eq!(plan.param("rural_urban"), None);
    assert_eq!(plan.param("measures"), None);
    assert_eq!(plan.param("c_sex"), Some("0,1,2"));
}

#[tokio::test]
async fn test_build_url_rejects_dataset_without_geography() {
    let client = NomisClient::connect(nomis_fetcher(), &test_config(), "key")
        .await
        .unwrap();

    // No dimension pages exist for NM_1_1, so failing before any fetch is required
    let result = client.build_url("JSA").await;
    assert!(matches!(result, Err(LinkerError::UnsupportedDataset { .. })));
}

#[tokio::test]
async fn test_policy_from_config() {
    let config = test_config().with_match_policy(MatchPolicy::RejectAmbiguous);
    let client = NomisClient::connect(nomis_fetcher(), &config, "key")
        .await
        .unwrap();

    assert!(matches!(
        client.build_url("KS101EW").await,
        Err(LinkerError::AmbiguousDataset { .. })
    ));
}

#[tokio::test]
async fn test_missing_dimension_page_is_http_error() {
    let fetcher = StaticFetcher::new().with_page(
        format!("{}def.htm", ROOT),
        super::definitions_page(),
    );
    let client = NomisClient::connect(fetcher, &test_config(), "key")
        .await
        .unwrap();

    assert!(matches!(
        client.build_url("KS101EW").await,
        Err(LinkerError::Http { .. })
    ));
}

#[tokio::test]
async fn test_download_decodes_cells() {
    let url = format!(
        "{}NM_1603_1.data.csv?date=latest&geography=1249902593...1249937345&rural_urban=0\
         &cell=0,1,2&measures=20100\
         &select=record_count,geography_name,geography_code,obs_value,cell&uid=k",
        ROOT
    );
    let csv = "RECORD_COUNT,GEOGRAPHY_NAME,GEOGRAPHY_CODE,OBS_VALUE,CELL\n\
               4,Hartlepool 001A,E01011949,1800,0\n\
               4,Hartlepool 001A,E01011949,880,1\n";
    let fetcher = nomis_fetcher().with_page(url.clone(), csv);
    let client = NomisClient::connect(fetcher, &test_config(), "k")
        .await
        .unwrap();

    let plan = client.build_url("KS101EW").await.unwrap();
    assert_eq!(plan.url, url);

    let frame = client.download(&plan).await.unwrap();
    let labels = frame.column("CELL_NAME").unwrap().str().unwrap();
    assert_eq!(labels.get(0), Some("All usual residents"));
    assert_eq!(labels.get(1), Some("Males"));
}
