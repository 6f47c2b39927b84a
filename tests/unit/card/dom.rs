use super::*;

fn dom() -> CardDom {
    let content = TicketContent::issued("DR-42", "300", Some("05 Mar 2026".to_string()));
    let page = PageContext::from_origin(Some("https://tickets.example.org"));
    CardDom::build(&content, &page, NaiveDate::from_ymd_opt(2026, 3, 5).unwrap()).unwrap()
}

#[test]
fn build_fills_fixed_layout() {
    let d = dom();
    assert_eq!(d.width_px, CARD_WIDTH_PX);
    assert_eq!(d.amount.text, "₦300");
    assert_eq!(d.fields[0].value, "DR-42");
    assert_eq!(d.fields[1].value, "05 Mar 2026");
    assert_eq!(d.fields[2].value, "Printed");
    assert_eq!(d.fields[3].value, "Single Trip");
    assert_eq!(d.logo.src, LOGO_PATH);
    assert!(!d.logo.is_embedded());
    assert!(!d.ready_attr);
}

#[test]
fn date_defaults_to_today_when_backend_has_none() {
    let content = TicketContent::issued("DR-1", "300", None);
    let d = CardDom::build(
        &content,
        &PageContext::default(),
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
    )
    .unwrap();
    assert_eq!(d.fields[1].value, "19 Oct 2026");
}

#[test]
fn set_logo_embeds_data_uri() {
    let mut d = dom();
    let logo = LogoAsset::fallback();
    d.set_logo(&logo);
    assert!(d.logo.is_embedded());
    assert_eq!(d.logo.natural, Some((100, 100)));
    assert_eq!(d.image_slots().len(), 1);
}

#[test]
fn font_override_replaces_every_family() {
    let mut d = dom();
    let before = d.font_families();
    assert!(before.contains("Montserrat"));
    assert!(before.contains("Playfair Display"));

    d.style.font_override = Some("Arial, Roboto, sans-serif".to_string());
    let after = d.font_families();
    assert_eq!(
        after.into_iter().collect::<Vec<_>>(),
        vec!["Arial", "Roboto", "sans-serif"]
    );
    assert_eq!(d.effective_family(&d.slogan), "Arial, Roboto, sans-serif");
}

#[test]
fn split_family_list_strips_quotes() {
    let names: Vec<_> = split_family_list("'Playfair Display', \"Inter\", serif,").collect();
    assert_eq!(names, vec!["Playfair Display", "Inter", "serif"]);
}
