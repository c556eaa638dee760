use chrono::NaiveDate;
use parish_core::db::open_db_in_memory;
use parish_core::{
    ErrorKind, Family, Gender, HouseholdDetails, Member, ParishRegister, RegisterError,
    ResponseClass,
};

fn household(number: &str, unit: &str, ward: &str) -> Family {
    let mut family = Family::new(number, "Edappally");
    family.family_unit = unit.to_string();
    family.ward_number = ward.to_string();
    family
}

#[test]
fn new_family_starts_headless() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);

    let mut family = household(" F-1 ", "St. Joseph", "3");
    family.head_of_family_name = Some("Nobody".to_string());
    let created = register.create_family(family).unwrap();
    assert_eq!(created.family_number, "F-1");
    assert!(created.is_headless());

    let stored = register.get_family("F-1").unwrap().unwrap();
    assert!(stored.head_of_family_name.is_none());
    assert!(register.family_overview("F-1").unwrap().is_headless());
}

#[test]
fn duplicate_or_blank_family_number_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    register
        .create_family(household("F-1", "St. Joseph", "3"))
        .unwrap();

    let err = register
        .create_family(household("F-1", "St. Mary", "4"))
        .unwrap_err();
    assert!(matches!(err, RegisterError::DuplicateFamilyNumber(ref n) if n == "F-1"));
    assert_eq!(err.kind().response_class(), ResponseClass::Conflict);

    let err = register
        .create_family(household("  ", "St. Mary", "4"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn update_keeps_head_name() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    register
        .create_family(household("F-1", "St. Joseph", "3"))
        .unwrap();
    register
        .add_member(
            Member::new(
                "Antony",
                Gender::Male,
                NaiveDate::from_ymd_opt(1955, 9, 9).unwrap(),
            )
            .in_family("F-1"),
        )
        .unwrap();

    let updated = register
        .update_family(
            "F-1",
            HouseholdDetails {
                name: "Edappally House".to_string(),
                location: Some("Kottayam".to_string()),
                village: None,
                contact_number: Some("0481-222".to_string()),
                family_unit: "St. Mary".to_string(),
                ward_number: "5".to_string(),
                subscription: true,
            },
        )
        .unwrap();
    assert_eq!(updated.name, "Edappally House");
    assert_eq!(updated.head_of_family_name.as_deref(), Some("Antony"));

    let stored = register.get_family("F-1").unwrap().unwrap();
    assert_eq!(stored, updated);

    let err = register
        .update_family(
            "F-404",
            HouseholdDetails {
                name: "Nowhere".to_string(),
                location: None,
                village: None,
                contact_number: None,
                family_unit: String::new(),
                ward_number: String::new(),
                subscription: false,
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn family_with_members_cannot_be_deleted() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    register
        .create_family(household("F-1", "St. Joseph", "3"))
        .unwrap();
    register
        .create_family(household("F-2", "St. Joseph", "3"))
        .unwrap();
    register
        .add_member(
            Member::new(
                "Antony",
                Gender::Male,
                NaiveDate::from_ymd_opt(1955, 9, 9).unwrap(),
            )
            .in_family("F-1"),
        )
        .unwrap();

    let err = register.delete_family("F-1").unwrap_err();
    assert!(matches!(
        err,
        RegisterError::FamilyInUse { members: 1, .. }
    ));

    register.delete_family("F-2").unwrap();
    assert!(register.get_family("F-2").unwrap().is_none());
    assert_eq!(
        register.delete_family("F-2").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn units_and_blocks_are_distinct_and_sorted() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    register
        .create_family(household("F-1", "St. Mary", "4"))
        .unwrap();
    register
        .create_family(household("F-2", "St. Joseph", "3"))
        .unwrap();
    register
        .create_family(household("F-3", "St. Mary", "3"))
        .unwrap();
    register.create_family(household("F-4", "", "")).unwrap();

    assert_eq!(
        register.list_family_units().unwrap(),
        vec!["St. Joseph", "St. Mary"]
    );
    assert_eq!(register.list_family_blocks().unwrap(), vec!["3", "4"]);

    let numbers: Vec<String> = register
        .list_families()
        .unwrap()
        .into_iter()
        .map(|family| family.family_number)
        .collect();
    assert_eq!(numbers, vec!["F-1", "F-2", "F-3", "F-4"]);
}
