//! The fixed template source the catalog is derived from.

use crate::models::AnalyticsKey;

/// A template as written, before hashing and numbering.
#[derive(Debug, Clone)]
pub struct RawTemplate {
    pub level: u8,
    pub text: &'static str,
    pub params: &'static [&'static str],
    pub description: &'static str,
    pub analytics: Option<AnalyticsKey>,
}

pub static RAW_TEMPLATES: &[RawTemplate] = &[
    // Level 0
    RawTemplate {
        level: 0,
        text: r#"ASK WHERE {
  ?pat a bto:Patient ;
       bto:hasDisease  {disease} .
}"#,
        params: &["disease"],
        description: "Is there any patient diagnosed with DISEASE?",
        analytics: None,
    },
    RawTemplate {
        level: 0,
        text: r#"ASK WHERE {
  ?pat a bto:Patient ;
       bto:hasDisease {disease} ;
       bto:undergo ?eO.
  ?eO  a bto:Onset ;
       bto:ageOnset ?aO .
  FILTER(?aO < {age})
}"#,
        params: &["disease", "age"],
        description: "Is there any DISEASE patient under AGE years old?",
        analytics: None,
    },
    // Level 1
    RawTemplate {
        level: 1,
        text: r#"SELECT (COUNT(DISTINCT ?pat) AS ?nDISEASE) WHERE {
  ?pat a bto:Patient ;
       bto:hasDisease {disease} .
}"#,
        params: &["disease"],
        description: "How many patients are diagnosed with DISEASE?",
        analytics: None,
    },
    RawTemplate {
        level: 1,
        text: r#"SELECT (COUNT(DISTINCT ?pat) AS ?nSex) WHERE {
  ?pat a bto:Patient ;
       bto:hasDisease {disease} ;
       bto:sex "{sex}" .
}"#,
        params: &["disease", "sex"],
        description: "How many patients have DISEASE filtered by SEX?",
        analytics: None,
    },
    // Level 2
    RawTemplate {
        level: 2,
        text: r#"SELECT (AVG(?aO) AS ?avgAge) WHERE {
  ?pat a bto:Patient ;
       bto:hasDisease {disease} ;
       bto:undergo ?eO.
  ?eO  a bto:Onset ;
       bto:ageOnset ?aO .
}"#,
        params: &["disease"],
        description: "What is the average age at onset of DISEASE patients?",
        analytics: None,
    },
    RawTemplate {
        level: 2,
        text: r#"SELECT (AVG(xsd:integer(?diff)) AS ?medianSurvivalDays) WHERE {
  ?pat a bto:Patient ;
       bto:hasDisease {disease} ;
       bto:deathDate ?d .
  ?ev  a bto:Onset ;
       bto:eventStart ?s ;
       bto:registeredFor ?pat .
  FILTER ( bto:eventStart >= "{starting_date}"^^xsd:date )
  BIND( xsd:integer(?d) - xsd:integer(?s) AS ?diff )
}"#,
        params: &["disease", "starting_date"],
        description: "Median survival time (days) from onset to death, after STARTING_DATE",
        analytics: None,
    },
    // Level 3
    RawTemplate {
        level: 3,
        text: r#"SELECT ?site (AVG(?ageOn) AS ?avgOnsetAge) 
WHERE {
  ?pat a bto:Patient ;
       bto:hasDisease NCIT:C34373 ;
       bto:undergo ?ev .
  ?ev  a bto:Onset ;
       bto:ageOnset ?ageOn ;
       bto:bulbarOnset ?b .
  BIND(IF(?b = true,"Bulbar","Spinal") AS ?site)
}
GROUP BY ?site"#,
        params: &[],
        description: "Average age at onset grouped by bulbar vs spinal (ALS-specific)",
        analytics: None,
    },
    RawTemplate {
        level: 3,
        text: r#"SELECT ?bracket (COUNT(DISTINCT ?pat) AS ?n) WHERE {
  ?pat a bto:Patient ;
       bto:hasDisease {disease} ;
       bto:undergo ?ev .
  ?ev  a bto:Onset ;
       bto:ageOnset ?ageOn .
  BIND(
    IF(?ageOn < {age1}, "{age1}",
      IF(?ageOn <= {age2}, "{age1}–{age2}", ">{age3}")
    ) AS ?bracket
  )
}
GROUP BY ?bracket"#,
        params: &["disease", "age1", "age2", "age3"],
        description: "Count of DISEASE patients by age bracket",
        analytics: Some(AnalyticsKey::AgeDist),
    },
    // Level 4
    RawTemplate {
        level: 4,
        text: r#"SELECT ?ageOn ?sex WHERE {
  ?pat a bto:Patient ;
       bto:hasDisease {disease} ;
       bto:sex ?sex ;
       bto:undergo ?ev .
  ?ev  a bto:Onset ;
       bto:ageOnset ?ageOn .
}"#,
        params: &["disease"],
        description: "List ages & sexes of DISEASE patients (anonymized)",
        analytics: None,
    },
    RawTemplate {
        level: 4,
        text: r#"SELECT ?onsetTypes (COUNT(DISTINCT ?pat) AS ?n) WHERE {
  ?pat a bto:Patient ;
       bto:hasDisease {disease} ;
       bto:undergo ?ev .
  ?ev  a bto:Onset ;
       bto:eventStart     ?tDate ;
       bto:bulbarOnset  ?bOns ;
       bto:axialOnset  ?aOns ;
       bto:generalizedOnset  ?gOns ;
       bto:limbsOnset  ?lOns .
  BIND(
  	CONCAT(
    	IF(?aOns = true, "Axial", ""),
		IF(?bOns = true, "Bulbar", ""),
        IF(?gOns = true, "General", ""),
        IF(?lOns = true, "Limbs", "")
    ) AS ?onsetTypes
   )
}
GROUP BY ?onsetTypes"#,
        params: &["disease"],
        description: "Count of DISEASE patients by onset-type combinations (Axial, Bulbar, General, Limbs)",
        analytics: None,
    },
    // Level 5
    RawTemplate {
        level: 5,
        text: r#"SELECT (MD5(STR(?pat)) AS ?anonID) ?ageOn ?b WHERE {
  ?pat a bto:Patient ;
       bto:hasDisease  {disease} ;
        bto:undergo ?ev .
  ?ev  a bto:Onset ;
       bto:ageOnset    ?ageOn ;
       bto:bulbarOnset ?b .
}"#,
        params: &["disease"],
        description: "Anonymized ALS-onset profile (MD5 pat, age, onset age, bulbar)",
        analytics: Some(AnalyticsKey::KlDiv),
    },
    RawTemplate {
        level: 5,
        text: r#"SELECT (MD5(STR(?pat)) AS ?anonID)
       ?tDate ?onsetTypes WHERE {
  ?pat a bto:Patient ;
       bto:hasDisease    {disease} ;
       bto:undergo       ?ev .
  ?ev  a bto:Onset ;
       bto:eventStart     ?tDate ;
       bto:bulbarOnset  ?bOns ;
       bto:axialOnset  ?aOns ;
       bto:generalizedOnset  ?gOns ;
       bto:limbsOnset  ?lOns .
  BIND(
  	CONCAT(
    	IF(?aOns = true, "Axial", ""),
		IF(?bOns = true, "Bulbar", ""),
        IF(?gOns = true, "General", ""),
        IF(?lOns = true, "Limbs", "")
    ) AS ?onsetTypes
   )
}
ORDER BY ?anonID ?tDate"#,
        params: &["disease"],
        description: "Anonymized onset profile: MD5 hash of patient URI, onset date and onset-type combination for DISEASE patients",
        analytics: None,
    },
    // Level 6
    RawTemplate {
        level: 6,
        text: r#"SELECT * WHERE {
  ?pat a bto:Patient ;
       bto:hasDisease  {disease} ;
       ?p ?o .
}"#,
        params: &["disease"],
        description: "All data for DISEASE patients (including IDs)",
        analytics: None,
    },
    RawTemplate {
        level: 6,
        text: r#"SELECT ?pat ?name ?aOns ?sex ?ev ?evType ?evStart  WHERE {
  ?pat a bto:Patient ;
       bto:sex           ?sex ;
       bto:undergo      ?ev ;
       bto:hasDisease    {disease} .
  ?ev  a ?evType ;
       bto:ageOnset ?aOns ;
       bto:eventStart    ?evStart .
}"#,
        params: &["disease"],
        description: "Complete patient profiles for DISEASE",
        analytics: None,
    },
];
