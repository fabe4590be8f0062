use plugwise_smile::DomainObjects;
use plugwise_smile::protocol::escape_illegal_xml_characters;

fn snapshot(xml: &str) -> DomainObjects {
    DomainObjects::parse(&escape_illegal_xml_characters(xml)).unwrap()
}

#[test]
fn single_thermostat_temperature() {
    let snapshot = snapshot(
        r#"<domain_objects>
            <appliance id="t"><type>thermostat</type><logs>
                <point_log id="42"><type>temperature</type><period><measurement>19.5</measurement></period></point_log>
            </logs></appliance>
            <module><services><thermo_meter log_type="temperature">
                <functionalities><point_log id="42"/></functionalities>
            </thermo_meter></services></module>
        </domain_objects>"#,
    );
    let id = snapshot.point_log_id("temperature").unwrap();
    assert_eq!(id, "42");
    let value: f64 = snapshot.measurement(id).unwrap().parse().unwrap();
    assert_eq!(value, 19.5);
}

#[test]
fn point_log_id_requires_module_service() {
    let snapshot = snapshot(
        r#"<domain_objects>
            <appliance><logs><point_log id="42"><type>temperature</type></point_log></logs></appliance>
            <temperature log_type="temperature"><functionalities><point_log id="7"/></functionalities></temperature>
        </domain_objects>"#,
    );
    assert_eq!(snapshot.point_log_id("temperature"), None);
}

#[test]
fn first_matching_service_wins() {
    let snapshot = snapshot(
        r#"<domain_objects>
            <module><services>
                <thermo_meter log_type="temperature"><functionalities><point_log id="1"/></functionalities></thermo_meter>
            </services></module>
            <module><services>
                <thermo_meter log_type="temperature"><functionalities><point_log id="2"/></functionalities></thermo_meter>
            </services></module>
        </domain_objects>"#,
    );
    assert_eq!(snapshot.point_log_id("temperature"), Some("1"));
}

#[test]
fn unescaped_names_parse_after_escaping() {
    let snapshot = snapshot(
        r#"<domain_objects><rule id="r"><name>Heat & Cool</name><active>true</active>
            <directives><when><then icon="heat & cool"/></when></directives></rule></domain_objects>"#,
    );
    assert_eq!(snapshot.rules[0].name.as_deref(), Some("Heat & Cool"));
    assert_eq!(snapshot.active_rule_icon(), Some("heat & cool"));
}

#[test]
fn empty_document_has_nothing() {
    let snapshot = snapshot("<domain_objects/>");
    assert!(snapshot.objects.is_empty());
    assert_eq!(snapshot.point_log_id("temperature"), None);
    assert_eq!(snapshot.measurement("42"), None);
    assert_eq!(snapshot.thermostat_preset(), None);
    assert_eq!(snapshot.active_rule_icon(), None);
}
