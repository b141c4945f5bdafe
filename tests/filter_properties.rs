use beholder::client::{ExternalIds, OpenAccessPdf, RawPaper};
use beholder::{Availability, DateAndAvailabilityFilter, DateWindow};
use chrono::{Days, NaiveDate};
use proptest::prelude::*;

fn window() -> DateWindow {
    DateWindow::new(
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 1, 14).unwrap(),
    )
    .unwrap()
}

/// Dates from a month before the window to a month after it
fn any_date() -> impl Strategy<Value = NaiveDate> {
    let base = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
    (0u64..75).prop_map(move |offset| base + Days::new(offset))
}

fn raw_paper(
    title: &str,
    date: NaiveDate,
    pdf: bool,
    doi: bool,
    abstract_text: Option<String>,
) -> RawPaper {
    RawPaper {
        title: Some(title.to_string()),
        publication_date: Some(date.format("%Y-%m-%d").to_string()),
        open_access_pdf: pdf.then(|| OpenAccessPdf {
            url: Some("https://example.org/paper.pdf".to_string()),
            status: None,
        }),
        external_ids: doi.then(|| ExternalIds {
            doi: Some("10.5555/paper".to_string()),
        }),
        abstract_text,
        ..RawPaper::default()
    }
}

proptest! {
    #[test]
    fn test_kept_iff_in_window_with_link_or_doi(
        title in "[A-Za-z][A-Za-z ]{0,30}",
        date in any_date(),
        pdf in any::<bool>(),
        doi in any::<bool>(),
        abstract_text in proptest::option::of("[a-z ]{1,40}"),
    ) {
        let filter = DateAndAvailabilityFilter::new(window());
        let paper = raw_paper(&title, date, pdf, doi, abstract_text);

        let candidate = filter.classify(&paper);
        prop_assert_eq!(candidate.is_some(), window().contains(date) && (pdf || doi));

        if let Some(candidate) = candidate {
            prop_assert_eq!(candidate.publication_date, date);
            prop_assert_eq!(
                matches!(candidate.availability, Availability::PdfLink { .. }),
                pdf
            );
            prop_assert_eq!(candidate.doi().is_some(), doi);
        }
    }

    #[test]
    fn test_apply_keeps_order_of_eligible_results(
        dates in prop::collection::vec(any_date(), 0..20),
    ) {
        let filter = DateAndAvailabilityFilter::new(window());
        let papers: Vec<RawPaper> = dates
            .iter()
            .enumerate()
            .map(|(i, date)| raw_paper(&format!("Paper {i}"), *date, true, false, None))
            .collect();

        let kept: Vec<NaiveDate> = filter
            .apply(&papers)
            .into_iter()
            .map(|candidate| candidate.publication_date)
            .collect();
        let expected: Vec<NaiveDate> = dates
            .into_iter()
            .filter(|date| window().contains(*date))
            .collect();
        prop_assert_eq!(kept, expected);
    }
}
