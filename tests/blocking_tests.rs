use plugwise_smile::{ConnectionState, PlugwiseClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOMAIN_OBJECTS: &str = r#"<domain_objects>
  <appliance><type>thermostat</type><logs>
    <point_log id="42"><type>temperature</type><period><measurement>21.5</measurement></period></point_log>
    <point_log id="44"><type>preset_state</type><period><measurement>home</measurement></period></point_log>
  </logs></appliance>
  <module><services>
    <thermo_meter log_type="temperature"><functionalities><point_log id="42"/></functionalities></thermo_meter>
  </services></module>
</domain_objects>"#;

#[test]
fn blocking_client_connects_and_reads() {
    let server_rt = tokio::runtime::Runtime::new().unwrap();
    let server = server_rt.block_on(MockServer::start());
    server_rt.block_on(
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(404).set_body_string("<error/>"))
            .mount(&server),
    );
    server_rt.block_on(
        Mock::given(method("GET"))
            .and(path("/core/domain_objects"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DOMAIN_OBJECTS))
            .expect(1)
            .mount(&server),
    );

    let addr = server.address();
    let mut client = PlugwiseClient::builder(addr.ip().to_string(), "abcdefgh")
        .port(addr.port())
        .build_blocking()
        .unwrap();

    assert!(client.connect());
    assert_eq!(client.state(), ConnectionState::Connected);

    client.update_device().unwrap();
    client.update_device().unwrap();
    assert_eq!(client.current_temperature().unwrap(), Some(21.5));
    assert_eq!(client.schedule_temperature().unwrap(), None);
    assert_eq!(client.current_preset().unwrap().as_deref(), Some("home"));

    client.close_connection();
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(client.update_domain_objects().is_err());

    server_rt.block_on(server.verify());
}
