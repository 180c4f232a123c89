//! Commute-flow aggregation for jobs located in the study area.

use serde::Serialize;

use crate::geography::{AllowList, GeoLevel, truncate};
use crate::lodes::OdFlow;
use crate::metrics::{pct, pct_change, sum_by};

/// Bay Area county names keyed by 5-digit state+county FIPS.
pub static COUNTY_NAMES: &[(&str, &str)] = &[
    ("06001", "Alameda County"),
    ("06013", "Contra Costa County"),
    ("06041", "Marin County"),
    ("06055", "Napa County"),
    ("06075", "San Francisco County"),
    ("06081", "San Mateo County"),
    ("06085", "Santa Clara County"),
    ("06095", "Solano County"),
    ("06097", "Sonoma County"),
];

/// Where the workers of one year's in-area jobs live.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommuteSummary {
    pub year: u16,
    pub total_jobs: u64,
    /// Home and work in the same tract.
    pub same_tract: u64,
    /// Home tract inside the study area.
    pub live_work_in_area: u64,
    /// Home tract outside the study area (or unplaceable).
    pub commute_in: u64,
    pub pct_live_in_area: f64,
    pub pct_commute_in: f64,
}

/// Summarizes flows already restricted to in-area workplaces.
///
/// `live_work_in_area + commute_in == total_jobs`: each flow lands in
/// exactly one of the two buckets.
pub fn summarize(year: u16, flows: &[OdFlow], allow: &AllowList) -> CommuteSummary {
    let mut total_jobs = 0;
    let mut same_tract = 0;
    let mut live_work_in_area = 0;

    for flow in flows {
        total_jobs += flow.s000;
        if flow.home_tract().is_some() && flow.home_tract() == flow.work_tract() {
            same_tract += flow.s000;
        }
        if allow.admits(&flow.h_geocode) {
            live_work_in_area += flow.s000;
        }
    }
    let commute_in = total_jobs - live_work_in_area;

    CommuteSummary {
        year,
        total_jobs,
        same_tract,
        live_work_in_area,
        commute_in,
        pct_live_in_area: pct(live_work_in_area as f64, total_jobs as f64),
        pct_commute_in: pct(commute_in as f64, total_jobs as f64),
    }
}

/// Change between a pre-pandemic and a later year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommuterLoss {
    pub pre_year: u16,
    pub post_year: u16,
    pub jobs_pre: u64,
    pub jobs_post: u64,
    pub job_change: i64,
    pub job_change_pct: f64,
    pub commute_in_pre: u64,
    pub commute_in_post: u64,
    pub commuters_lost: i64,
    pub pct_commuters_lost: f64,
    pub transit_share: f64,
    /// `commuters_lost * transit_share`, truncated toward zero.
    pub transit_commuters_lost: i64,
}

pub fn commuter_loss(
    pre: &CommuteSummary,
    post: &CommuteSummary,
    transit_share: f64,
) -> CommuterLoss {
    let commuters_lost = pre.commute_in as i64 - post.commute_in as i64;
    CommuterLoss {
        pre_year: pre.year,
        post_year: post.year,
        jobs_pre: pre.total_jobs,
        jobs_post: post.total_jobs,
        job_change: post.total_jobs as i64 - pre.total_jobs as i64,
        job_change_pct: pct_change(pre.total_jobs as f64, post.total_jobs as f64),
        commute_in_pre: pre.commute_in,
        commute_in_post: post.commute_in,
        commuters_lost,
        pct_commuters_lost: pct(commuters_lost as f64, pre.commute_in as f64),
        transit_share,
        transit_commuters_lost: (commuters_lost as f64 * transit_share).trunc() as i64,
    }
}

/// Jobs by home county.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginCounty {
    pub year: u16,
    pub county: String,
    pub name: String,
    pub jobs: u64,
    pub pct_of_jobs: f64,
}

pub fn county_name(code: &str) -> String {
    COUNTY_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("County {code}"))
}

/// The `n` home counties sending the most workers, largest first.
///
/// Ties break on county code so the ranking is deterministic.
pub fn top_origin_counties(year: u16, flows: &[OdFlow], n: usize) -> Vec<OriginCounty> {
    let totals = sum_by(
        flows,
        |f| truncate(&f.h_geocode, GeoLevel::County),
        |f| f.s000,
    );
    let all_jobs: u64 = flows.iter().map(|f| f.s000).sum();

    let mut ranked: Vec<(String, u64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    ranked
        .into_iter()
        .take(n)
        .map(|(county, jobs)| OriginCounty {
            year,
            name: county_name(&county),
            pct_of_jobs: pct(jobs as f64, all_jobs as f64),
            county,
            jobs,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(w: &str, h: &str, jobs: u64) -> OdFlow {
        OdFlow {
            w_geocode: w.to_string(),
            h_geocode: h.to_string(),
            s000: jobs,
            ..Default::default()
        }
    }

    fn allow() -> AllowList {
        AllowList::new(GeoLevel::Tract, ["06001400500", "06001422200"]).unwrap()
    }

    fn flows_2019() -> Vec<OdFlow> {
        vec![
            flow("060014005001001", "060014005001009", 4),
            flow("060014005001001", "060014222001000", 6),
            flow("060014222001000", "060750123450010", 20),
            flow("060014222001000", "060133550001001", 10),
        ]
    }

    #[test]
    fn test_summarize_buckets_add_up() {
        let s = summarize(2019, &flows_2019(), &allow());
        assert_eq!(s.total_jobs, 40);
        assert_eq!(s.same_tract, 4);
        assert_eq!(s.live_work_in_area, 10);
        assert_eq!(s.commute_in, 30);
        assert_eq!(s.live_work_in_area + s.commute_in, s.total_jobs);
        assert_eq!(s.pct_commute_in, 75.0);
    }

    #[test]
    fn test_summarize_empty_uses_zero_sentinel() {
        let s = summarize(2021, &[], &allow());
        assert_eq!(s.total_jobs, 0);
        assert_eq!(s.pct_commute_in, 0.0);
    }

    #[test]
    fn test_short_home_code_counts_as_commute_in() {
        let flows = vec![flow("060014005001001", "0600", 3)];
        let s = summarize(2019, &flows, &allow());
        assert_eq!(s.commute_in, 3);
        assert_eq!(s.same_tract, 0);
    }

    #[test]
    fn test_commuter_loss() {
        let pre = summarize(2019, &flows_2019(), &allow());
        let flows_2021 = [
            flow("060014222001000", "060750123450010", 12),
            flow("060014005001001", "060014005001009", 4),
        ];
        let post = summarize(2021, &flows_2021, &allow());
        let loss = commuter_loss(&pre, &post, 0.13);

        assert_eq!(loss.commuters_lost, 18);
        assert_eq!(loss.pct_commuters_lost, 60.0);
        assert_eq!(loss.transit_commuters_lost, 2);
        assert_eq!(loss.job_change, -24);
        assert_eq!(loss.job_change_pct, -60.0);
    }

    #[test]
    fn test_top_origin_counties() {
        let top = top_origin_counties(2019, &flows_2019(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].county, "06075");
        assert_eq!(top[0].name, "San Francisco County");
        assert_eq!(top[0].jobs, 20);
        assert_eq!(top[0].pct_of_jobs, 50.0);
        // 06001 and 06013 both have 10 jobs; code order breaks the tie
        assert_eq!(top[1].county, "06001");
    }

    #[test]
    fn test_county_totals_independent_of_order() {
        let mut reversed = flows_2019();
        reversed.reverse();
        assert_eq!(
            top_origin_counties(2019, &flows_2019(), 10),
            top_origin_counties(2019, &reversed, 10)
        );
    }

    #[test]
    fn test_unknown_county_name() {
        assert_eq!(county_name("06999"), "County 06999");
    }
}
