use chrono::NaiveDate;
use parish_core::db::open_db_in_memory;
use parish_core::{
    DeathDetails, DeathSubject, DeathSubmission, ErrorKind, Family, Gender, MaritalLink,
    MaritalStatus, MarriageDetails, MarriageListQuery, MarriageParty, MarriageSide,
    MarriageSubmission, Member, MemberProblem, MemberProfile, ParishRegister, RegisterError, ResponseClass,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn wedding(marriage_id: &str, first: MarriageSide, second: MarriageSide) -> MarriageSubmission {
    MarriageSubmission {
        marriage_id: marriage_id.to_string(),
        first,
        second,
        details: MarriageDetails::on(date(2020, 11, 14)),
    }
}

fn seed(register: &ParishRegister<'_>) -> (Member, Member) {
    register
        .create_family(Family::new("F-1", "Thekkekara"))
        .unwrap();
    register
        .create_family(Family::new("F-2", "Vadakkel"))
        .unwrap();
    let groom = register
        .add_member(Member::new("George", Gender::Male, date(1992, 3, 3)).in_family("F-1"))
        .unwrap();
    let bride = register
        .add_member(Member::new("Ann", Gender::Female, date(1994, 8, 8)).in_family("F-2"))
        .unwrap();
    (groom, bride)
}

fn bury(register: &ParishRegister<'_>, member: &Member, sl_no: i64) {
    register
        .record_death(DeathSubmission {
            sl_no,
            subject: DeathSubject::Parishioner {
                member_id: member.uuid,
                family_number: member.family_number.clone().unwrap(),
            },
            next_hof_candidate: None,
            details: DeathDetails::new(member.name.clone(), date(2023, 1, 1)),
        })
        .unwrap();
}

#[test]
fn binding_two_members_links_both_sides() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let (groom, bride) = seed(&register);

    let record = register
        .record_marriage(wedding(
            "M-2020-01",
            MarriageSide::member(groom.uuid),
            MarriageSide::member(bride.uuid),
        ))
        .unwrap();
    assert_eq!(
        record.first,
        MarriageParty::Parishioner {
            member_id: groom.uuid,
            name: "George".to_string(),
        }
    );

    let groom_after = register.get_member(groom.uuid).unwrap().unwrap();
    assert_eq!(groom_after.marital_status, MaritalStatus::Married);
    assert_eq!(groom_after.spouse_id, Some(bride.uuid));
    assert_eq!(groom_after.spouse_name.as_deref(), Some("Ann"));
    let bride_after = register.get_member(bride.uuid).unwrap().unwrap();
    assert_eq!(bride_after.spouse_id, Some(groom.uuid));
    assert_eq!(bride_after.spouse_name.as_deref(), Some("George"));

    let stored = register.find_marriage_by_key("M-2020-01").unwrap().unwrap();
    assert_eq!(stored.uuid, record.uuid);
}

#[test]
fn binding_member_to_external_partner_sets_name_only() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let (groom, _bride) = seed(&register);

    register
        .record_marriage(wedding(
            "M-2020-02",
            MarriageSide::member(groom.uuid),
            MarriageSide::External {
                name: "Teresa".to_string(),
                home_parish: Some("St. Mary's".to_string()),
            },
        ))
        .unwrap();

    let groom_after = register.get_member(groom.uuid).unwrap().unwrap();
    assert_eq!(
        groom_after.marital_link(),
        MaritalLink::External {
            name: "Teresa".to_string()
        }
    );
}

#[test]
fn same_member_on_both_sides_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let (groom, _bride) = seed(&register);

    let err = register
        .record_marriage(wedding(
            "M-1",
            MarriageSide::member(groom.uuid),
            MarriageSide::member(groom.uuid),
        ))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SameIdentity);
    assert_eq!(err.kind().response_class(), ResponseClass::BadRequest);
    assert!(register.find_marriage_by_key("M-1").unwrap().is_none());
}

#[test]
fn deceased_or_unknown_member_cannot_marry() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let (groom, bride) = seed(&register);
    bury(&register, &bride, 1);

    let err = register
        .record_marriage(wedding(
            "M-1",
            MarriageSide::member(groom.uuid),
            MarriageSide::member(bride.uuid),
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        RegisterError::MemberInvalid {
            problem: MemberProblem::Deceased,
            ..
        }
    ));

    let err = register
        .record_marriage(wedding(
            "M-1",
            MarriageSide::member(groom.uuid),
            MarriageSide::member(uuid::Uuid::new_v4()),
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        RegisterError::MemberInvalid {
            problem: MemberProblem::Missing,
            ..
        }
    ));
    let groom_after = register.get_member(groom.uuid).unwrap().unwrap();
    assert_eq!(groom_after.marital_status, MaritalStatus::Single);
}

#[test]
fn married_member_cannot_bind_again_until_widowed() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let (groom, bride) = seed(&register);
    register
        .record_marriage(wedding(
            "M-1",
            MarriageSide::member(groom.uuid),
            MarriageSide::member(bride.uuid),
        ))
        .unwrap();

    let err = register
        .record_marriage(wedding(
            "M-2",
            MarriageSide::member(groom.uuid),
            MarriageSide::external("Clara"),
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        RegisterError::MemberInvalid {
            problem: MemberProblem::AlreadyMarried,
            ..
        }
    ));

    bury(&register, &bride, 1);
    register
        .record_marriage(wedding(
            "M-2",
            MarriageSide::member(groom.uuid),
            MarriageSide::external("Clara"),
        ))
        .unwrap();
    let groom_after = register.get_member(groom.uuid).unwrap().unwrap();
    assert_eq!(groom_after.spouse_name.as_deref(), Some("Clara"));
    assert!(groom_after.spouse_id.is_none());
}

#[test]
fn duplicate_marriage_id_is_conflict_and_links_nothing() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let (groom, bride) = seed(&register);
    register
        .record_marriage(wedding(
            "M-1",
            MarriageSide::external("Someone"),
            MarriageSide::external("Else"),
        ))
        .unwrap();

    let err = register
        .record_marriage(wedding(
            "M-1",
            MarriageSide::member(groom.uuid),
            MarriageSide::member(bride.uuid),
        ))
        .unwrap_err();
    assert!(matches!(err, RegisterError::DuplicateMarriageId(ref id) if id == "M-1"));
    assert_eq!(err.kind().response_class(), ResponseClass::Conflict);

    for id in [groom.uuid, bride.uuid] {
        let member = register.get_member(id).unwrap().unwrap();
        assert_eq!(member.marital_status, MaritalStatus::Single);
        assert!(member.spouse_id.is_none());
    }
}

#[test]
fn blank_marriage_id_or_partner_name_is_invalid_input() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);

    let err = register
        .record_marriage(wedding(
            "  ",
            MarriageSide::external("A"),
            MarriageSide::external("B"),
        ))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = register
        .record_marriage(wedding(
            "M-1",
            MarriageSide::external("A"),
            MarriageSide::external(""),
        ))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn deleting_marriage_releases_both_members() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let (groom, bride) = seed(&register);
    let record = register
        .record_marriage(wedding(
            "M-1",
            MarriageSide::member(groom.uuid),
            MarriageSide::member(bride.uuid),
        ))
        .unwrap();

    register.delete_marriage(record.uuid).unwrap();

    for id in [groom.uuid, bride.uuid] {
        let member = register.get_member(id).unwrap().unwrap();
        assert_eq!(member.marital_link(), MaritalLink::Single);
    }
    assert!(register.get_marriage(record.uuid).unwrap().is_none());
}

#[test]
fn deleting_marriage_after_member_removal_releases_remaining_side() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let (groom, bride) = seed(&register);
    let record = register
        .record_marriage(wedding(
            "M-1",
            MarriageSide::member(groom.uuid),
            MarriageSide::member(bride.uuid),
        ))
        .unwrap();

    // Ann is head of F-2; hand headship over before removing her.
    let sister = register
        .add_member(Member::new("Lucy", Gender::Female, date(1990, 1, 1)).in_family("F-2"))
        .unwrap();
    register.transfer_headship("F-2", sister.uuid).unwrap();
    register.delete_member(bride.uuid).unwrap();

    let groom_mid = register.get_member(groom.uuid).unwrap().unwrap();
    assert_eq!(
        groom_mid.marital_link(),
        MaritalLink::External {
            name: "Ann".to_string()
        }
    );

    register.delete_marriage(record.uuid).unwrap();
    let groom_after = register.get_member(groom.uuid).unwrap().unwrap();
    assert_eq!(groom_after.marital_link(), MaritalLink::Single);
}

#[test]
fn renamed_then_removed_spouse_is_still_released() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let (groom, bride) = seed(&register);
    let record = register
        .record_marriage(wedding(
            "M-1",
            MarriageSide::member(groom.uuid),
            MarriageSide::member(bride.uuid),
        ))
        .unwrap();

    register
        .update_member(
            bride.uuid,
            MemberProfile {
                name: "Ann Mary".to_string(),
                gender: bride.gender,
                date_of_birth: bride.date_of_birth,
                relation: None,
                phone: None,
                email: None,
                occupation: None,
            },
        )
        .unwrap();
    let renamed = register.get_marriage(record.uuid).unwrap().unwrap();
    assert_eq!(
        renamed.second,
        MarriageParty::Parishioner {
            member_id: bride.uuid,
            name: "Ann Mary".to_string(),
        }
    );

    let sister = register
        .add_member(Member::new("Lucy", Gender::Female, date(1990, 1, 1)).in_family("F-2"))
        .unwrap();
    register.transfer_headship("F-2", sister.uuid).unwrap();
    register.delete_member(bride.uuid).unwrap();

    // The detached link still counts as a marriage.
    let err = register
        .record_marriage(wedding(
            "M-2",
            MarriageSide::member(groom.uuid),
            MarriageSide::external("Rosa"),
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        RegisterError::MemberInvalid {
            problem: MemberProblem::AlreadyMarried,
            ..
        }
    ));

    register.delete_marriage(record.uuid).unwrap();
    let groom_after = register.get_member(groom.uuid).unwrap().unwrap();
    assert_eq!(groom_after.marital_link(), MaritalLink::Single);

    register
        .record_marriage(wedding(
            "M-2",
            MarriageSide::member(groom.uuid),
            MarriageSide::external("Rosa"),
        ))
        .unwrap();
}

#[test]
fn deleting_old_marriage_keeps_newer_bond() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let (groom, bride) = seed(&register);
    let first = register
        .record_marriage(wedding(
            "M-1",
            MarriageSide::member(groom.uuid),
            MarriageSide::member(bride.uuid),
        ))
        .unwrap();
    bury(&register, &bride, 1);
    register
        .record_marriage(wedding(
            "M-2",
            MarriageSide::member(groom.uuid),
            MarriageSide::external("Clara"),
        ))
        .unwrap();

    register.delete_marriage(first.uuid).unwrap();

    let groom_after = register.get_member(groom.uuid).unwrap().unwrap();
    assert_eq!(groom_after.spouse_name.as_deref(), Some("Clara"));
    let bride_after = register.get_member(bride.uuid).unwrap().unwrap();
    assert_eq!(bride_after.marital_status, MaritalStatus::Single);
}

#[test]
fn update_and_list_marriages() {
    let conn = open_db_in_memory().unwrap();
    let register = ParishRegister::new(&conn);
    let record = register
        .record_marriage(wedding(
            "M-1",
            MarriageSide::external("Jacob Mathew"),
            MarriageSide::external("Rachel"),
        ))
        .unwrap();
    register
        .record_marriage(wedding(
            "M-2",
            MarriageSide::external("Simon"),
            MarriageSide::external("Martha"),
        ))
        .unwrap();

    let mut details = MarriageDetails::on(date(2021, 1, 9));
    details.place = Some("St. Thomas Church".to_string());
    let updated = register.update_marriage(record.uuid, details).unwrap();
    assert_eq!(updated.details.date, date(2021, 1, 9));
    assert_eq!(updated.first, record.first);

    let matches = register
        .list_marriages(&MarriageListQuery {
            spouse_name: Some("mathew".to_string()),
            ..MarriageListQuery::default()
        })
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].marriage_id, "M-1");

    let all = register.list_marriages(&MarriageListQuery::default()).unwrap();
    let ids: Vec<&str> = all.iter().map(|m| m.marriage_id.as_str()).collect();
    assert_eq!(ids, vec!["M-1", "M-2"]);
}
