//! Scenario tests for the Extractor

#[cfg(test)]
mod tests {
    use crate::{DocumentExtractor, ExtractorConfig, ExtractorError, PMDA_NAMESPACE};
    use pmda_domain::MedicineRecord;

    fn doc(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<PackInsDoc xmlns="{}">{}</PackInsDoc>"#,
            PMDA_NAMESPACE, body
        )
    }

    fn lang(text: &str) -> String {
        format!(r#"<Lang xml:lang="ja">{}</Lang>"#, text)
    }

    fn detail(text: &str) -> String {
        format!("<Detail>{}</Detail>", lang(text))
    }

    fn item(header: &str, body: &str) -> String {
        format!("<Item><Header>{}</Header>{}</Item>", lang(header), body)
    }

    fn row(cells: &[&str]) -> String {
        let cells: String = cells
            .iter()
            .map(|c| format!("<SimpTblCell>{}</SimpTblCell>", lang(c)))
            .collect();
        format!("<SimpTblRow>{}</SimpTblRow>", cells)
    }

    fn table(rows: &[&[&str]], extra: &str) -> String {
        let rows: String = rows.iter().map(|r| row(r)).collect();
        format!("<TblBlock><SimpleTable>{}</SimpleTable>{}</TblBlock>", rows, extra)
    }

    fn extract(body: &str) -> Vec<MedicineRecord> {
        let extractor = DocumentExtractor::new(ExtractorConfig::default()).unwrap();
        extractor
            .extract("test.xml", doc(body).as_bytes())
            .unwrap()
            .records
    }

    fn strings<T: ToString>(items: &[T]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn capecitabine_dosage() -> String {
        let bsa_a: &[&[&str]] = &[
            &["体表面積", "朝食後", "夕食後"],
            &["&lt;1.25", "1500mg", "1500mg"],
            &["1.25–1.5", "1800mg", "1800mg"],
            &["≥1.5", "2100mg", "2100mg"],
        ];
        let bsa_b: &[&[&str]] = &[
            &["体表面積", "朝食後", "夕食後"],
            &["1.31m<Sup>2</Sup>未満", "900mg", "900mg"],
            &["1.31m<Sup>2</Sup>以上", "1200mg", "1200mg"],
        ];
        format!(
            "<InfoDoseAdmin><DoseAdmin>{}{}{}{}{}</DoseAdmin></InfoDoseAdmin>",
            detail("手術不能又は再発乳癌にはA法又はB法を使用する。"),
            detail("A法：体表面積にあわせて次の投与量を1日2回、21日間連日経口投与し、その後7日間休薬する。"),
            table(bsa_a, ""),
            detail("B法：体表面積にあわせて次の投与量を1日2回、14日間連日経口投与し、その後7日間休薬する。"),
            table(bsa_b, ""),
        )
    }

    #[test]
    fn test_capecitabine_style_protocols() {
        let records = extract(&capecitabine_dosage());
        assert_eq!(records.len(), 1);

        let dosage = strings(&records[0].clinical_info.dosage);
        assert_eq!(
            dosage,
            vec![
                "手術不能又は再発乳癌にはA法又はB法を使用する。".to_string(),
                "A法:体表面積にあわせて次の投与量を1日2回、21日間連日経口投与し、その後7日間休薬する。 / BSA <1.25: 朝食後 1500mg, 夕食後 1500mg; 1.25–1.5: 朝食後 1800mg, 夕食後 1800mg; ≥1.5: 朝食後 2100mg, 夕食後 2100mg".to_string(),
                "B法:体表面積にあわせて次の投与量を1日2回、14日間連日経口投与し、その後7日間休薬する。 / BSA 1.31m2未満: 朝食後 900mg, 夕食後 900mg; 1.31m2以上: 朝食後 1200mg, 夕食後 1200mg".to_string(),
            ]
        );
    }

    #[test]
    fn test_protocol_preserves_every_dose_verbatim() {
        let records = extract(&capecitabine_dosage());
        let line_a = records[0].clinical_info.dosage[1].as_str();

        for band in ["<1.25", "1.25–1.5", "≥1.5"] {
            assert!(line_a.contains(band), "missing band {}", band);
        }
        assert_eq!(line_a.matches("1500mg").count(), 2);
        assert_eq!(line_a.matches("1800mg").count(), 2);
        assert_eq!(line_a.matches("2100mg").count(), 2);
    }

    #[test]
    fn test_contrast_agent_style_table() {
        let rows: &[&[&str]] = &[
            &["検査", "イオパミロン注300（300mgI/mL）", "イオパミロン注370（370mgI/mL）"],
            &["脳血管撮影", "6～13mL", "—"],
            &["CT", "100mL", "50～100mL"],
        ];
        let body = format!(
            "<InfoDoseAdmin><DoseAdmin>{}{}</DoseAdmin></InfoDoseAdmin>",
            detail("通常、成人には下記の量を使用する。"),
            table(rows, &format!("<TblFootnote>{}</TblFootnote>", lang("年齢、体重により適宜増減する。"))),
        );
        let records = extract(&body);

        assert_eq!(
            strings(&records[0].clinical_info.dosage),
            vec![
                "通常、成人には下記の量を使用する。",
                "脳血管撮影:イオパミロン注300（300mgI/mL） 6～13mL",
                "CT:イオパミロン注300（300mgI/mL） 100mL/イオパミロン注370（370mgI/mL） 50～100mL",
                "Note:年齢、体重により適宜増減する。",
            ]
        );
    }

    #[test]
    fn test_plain_dosage_with_conditions() {
        let body = format!(
            "<InfoDoseAdmin><DoseAdmin><SimpleList>{}{}</SimpleList></DoseAdmin></InfoDoseAdmin>",
            item("〈高血圧症〉", &detail("通常、成人には1日1回5mgを経口投与する。")),
            item("〈狭心症〉", &detail("通常、成人には1日1回10mgを経口投与する。")),
        );
        let records = extract(&body);
        assert_eq!(
            strings(&records[0].clinical_info.dosage),
            vec![
                "高血圧症:通常、成人には1日1回5mgを経口投与する。",
                "狭心症:通常、成人には1日1回10mgを経口投与する。",
            ]
        );
    }

    #[test]
    fn test_dosage_mentions_outside_block() {
        let body = format!(
            "<InfoDoseAdmin><DoseAdmin>{}</DoseAdmin></InfoDoseAdmin><ImportantPrecautions>{}</ImportantPrecautions>",
            detail("1日1回投与する。"),
            detail("用法・用量を遵守すること。"),
        );
        let records = extract(&body);
        let info = &records[0].clinical_info;
        assert_eq!(
            strings(&info.dosage),
            vec!["1日1回投与する。", "用法・用量を遵守すること。"]
        );
        assert_eq!(strings(&info.warnings), vec!["用法・用量を遵守すること。"]);
    }

    #[test]
    fn test_dosage_mention_keeps_inline_markup() {
        let body = format!(
            "<ImportantPrecautions>{}</ImportantPrecautions>",
            detail("用法・用量は体表面積1m<Sup>2</Sup>あたりで計算する。<?enter?>腎機能に注意する。"),
        );
        let records = extract(&body);
        let info = &records[0].clinical_info;
        let expected = "用法・用量は体表面積1m2あたりで計算する。\n腎機能に注意する。";
        assert_eq!(strings(&info.dosage), vec![expected]);
        assert_eq!(strings(&info.warnings), vec![expected]);
    }

    #[test]
    fn test_conditioned_dosage_is_not_repeated_bare() {
        let body = format!(
            "<InfoDoseAdmin><DoseAdmin><SimpleList>{}</SimpleList></DoseAdmin></InfoDoseAdmin>",
            item("〈高血圧症〉", &detail("本剤の用法・用量は1日1回とする。")),
        );
        let records = extract(&body);
        assert_eq!(
            strings(&records[0].clinical_info.dosage),
            vec!["高血圧症:本剤の用法・用量は1日1回とする。"]
        );
    }

    #[test]
    fn test_lettered_protocols_keep_conditions_footnotes_and_trailing_text() {
        let bsa: &[&[&str]] = &[&["体表面積", "1回用量"], &["1.36m<Sup>2</Sup>未満", "1200mg"]];
        let note = |text: &str| format!("<TblFootnote>{}</TblFootnote>", lang(text));
        let body = format!(
            "<InfoDoseAdmin><DoseAdmin><SimpleList>{}{}</SimpleList>{}</DoseAdmin></InfoDoseAdmin>",
            item(
                "〈手術不能又は再発乳癌〉",
                &format!("{}{}", detail("A法：1日2回21日間経口投与する。"), table(bsa, &note("休薬期間を含む。"))),
            ),
            item(
                "〈治癒切除不能な進行胃癌〉",
                &format!("{}{}", detail("B法：1日2回14日間経口投与する。"), table(bsa, &note("白金製剤と併用する。"))),
            ),
            detail("なお、患者の状態により適宜減量する。"),
        );
        let records = extract(&body);

        assert_eq!(
            strings(&records[0].clinical_info.dosage),
            vec![
                "手術不能又は再発乳癌:A法:1日2回21日間経口投与する。 / BSA 1.36m2未満: 1回用量 1200mg",
                "手術不能又は再発乳癌:Note:休薬期間を含む。",
                "治癒切除不能な進行胃癌:B法:1日2回14日間経口投与する。 / BSA 1.36m2未満: 1回用量 1200mg",
                "治癒切除不能な進行胃癌:Note:白金製剤と併用する。",
                "なお、患者の状態により適宜減量する。",
            ]
        );
    }

    #[test]
    fn test_adverse_event_severity() {
        let body = format!(
            "<AdverseEvents><SeriousAdverseEvents><SimpleList>{}{}</SimpleList></SeriousAdverseEvents>\
             <OtherAdverseEvents><SimpleList>{}</SimpleList></OtherAdverseEvents></AdverseEvents>",
            item("骨髄抑制", &detail("汎血球減少があらわれることがある。")),
            item("ショック", ""),
            item("消化器", &detail("下痢")),
        );
        let records = extract(&body);
        let events = strings(&records[0].clinical_info.adverse_events);

        assert_eq!(
            events,
            vec![
                "Serious:骨髄抑制:汎血球減少があらわれることがある。",
                "Serious:ショック",
                "Non-serious:消化器:下痢",
            ]
        );
    }

    #[test]
    fn test_serious_events_never_tagged_non_serious() {
        let nested = item("〈効能共通〉", &format!("<SimpleList>{}</SimpleList>", item("Non-serious", &detail("x"))));
        let body = format!(
            "<AdverseEvents><SeriousAdverseEvents><SimpleList>{}</SimpleList></SeriousAdverseEvents></AdverseEvents>",
            nested
        );
        let records = extract(&body);
        for line in &records[0].clinical_info.adverse_events {
            assert!(line.as_str().starts_with("Serious:"), "{}", line);
        }
    }

    #[test]
    fn test_combination_tables() {
        let drug = |name: &str, symptoms: &str, mechanism: &str| {
            format!(
                "<Drug><DrugName>{}</DrugName><ClinSymptomsAndMeasures>{}</ClinSymptomsAndMeasures>\
                 <MechanismAndRiskFactors>{}</MechanismAndRiskFactors></Drug>",
                detail(name),
                detail(symptoms),
                detail(mechanism)
            )
        };
        let body = format!(
            "<ContraIndications>{}</ContraIndications>\
             <InteractionsWithOtherDrugs>\
               <ContraIndicatedCombinations>{}</ContraIndicatedCombinations>\
               <PrecautionsCombinations>{}</PrecautionsCombinations>\
             </InteractionsWithOtherDrugs>",
            detail("本剤の成分に対し過敏症の既往歴のある患者"),
            drug("ソリブジン", "重篤な血液障害", "代謝阻害"),
            drug("ワルファリン", "出血", "CYP2C9の阻害"),
        );
        let records = extract(&body);
        let info = &records[0].clinical_info;

        assert_eq!(
            strings(&info.contraindications),
            vec![
                "本剤の成分に対し過敏症の既往歴のある患者",
                "ソリブジン",
                "重篤な血液障害",
                "代謝阻害",
            ]
        );
        assert_eq!(
            strings(&info.interactions),
            vec![
                "ワルファリン",
                "Clinical symptoms and measures: 出血",
                "Mechanism and risk factors: CYP2C9の阻害",
            ]
        );
    }

    fn two_product_document() -> String {
        let composition = |brand: &str, amount: &str| {
            format!(
                r#"<CompositionForBrand ref="{}"><CompositionTable>
                    <ContainedAmount><ActiveIngredientName>{}</ActiveIngredientName><ValueAndUnit>{}</ValueAndUnit></ContainedAmount>
                    <InfoIndividualAdditive><IndividualAdditive>{}</IndividualAdditive></InfoIndividualAdditive>
                    <ListOfAdditives><Lang xml:lang="ja">乳糖水和物 50mg<?enter?>タルク</Lang></ListOfAdditives>
                </CompositionTable></CompositionForBrand>"#,
                brand,
                lang("カペシタビン"),
                lang(amount),
                lang("乳糖水和物"),
            )
        };
        let brand = |id: &str, name: &str, yj: &str| {
            format!(
                r#"<DetailBrandName id="{}"><ApprovalBrandName>{}</ApprovalBrandName><BrandCode><YJCode>{}</YJCode></BrandCode></DetailBrandName>"#,
                id,
                lang(name),
                yj
            )
        };
        format!(
            r#"<PackageInsertNo>4229101F1029_2_05</PackageInsertNo>
               <CompanyIdentifier>123456</CompanyIdentifier>
               <TherapeuticClassification>{classification}</TherapeuticClassification>
               {brand1}{brand2}
               <NameAddressManufact><Manufacturer><Name>{maker}</Name></Manufacturer></NameAddressManufact>
               <IndicationsOrEfficacy><SimpleList><Item>{indication}</Item></SimpleList></IndicationsOrEfficacy>
               <CompositionAndProperty>{comp1}{comp2}
                 <Property><PropertyTable><Formulation>{formulation}</Formulation><ColorTone>{tone}</ColorTone></PropertyTable></Property>
               </CompositionAndProperty>
               <PhyschemOfActIngredientsSection><PhyschemOfActIngredients>
                 <GeneralName>{general}</GeneralName>
                 <MolecularFormula>{formula}</MolecularFormula>
                 <MolecularWeight>{weight}</MolecularWeight>
                 <StructuralFormula><Lang xml:lang="ja">image</Lang></StructuralFormula>
               </PhyschemOfActIngredients></PhyschemOfActIngredientsSection>"#,
            classification = detail("代謝拮抗剤"),
            brand1 = brand("BRD_Drug1", "カペシタビン錠300mg", "4229101F1029"),
            brand2 = brand("BRD_Drug2", "カペシタビン錠600mg", "4229101F2025"),
            maker = lang("中外製薬株式会社"),
            indication = detail("手術不能又は再発乳癌"),
            comp1 = composition("BRD_Drug1", "300mg"),
            comp2 = composition("BRD_Drug2", "600mg"),
            formulation = lang("フィルムコーティング錠"),
            tone = lang("淡赤色"),
            general = detail("カペシタビン（Capecitabine）"),
            formula = detail("C<Sub>15</Sub>H<Sub>22</Sub>FN<Sub>3</Sub>O<Sub>6</Sub>"),
            weight = detail("359.35"),
        )
    }

    #[test]
    fn test_one_record_per_product() {
        let records = extract(&two_product_document());
        assert_eq!(records.len(), 2);

        let first = &records[0].essentials;
        assert_eq!(first.yj_code, "4229101F1029");
        assert_eq!(first.product_name, "カペシタビン錠300mg");
        assert_eq!(first.package_insert_no, "4229101F1029_2_05");
        assert_eq!(first.therapeutic_classification, "代謝拮抗剤");
        assert_eq!(first.form, "フィルムコーティング錠:淡赤色");
        assert_eq!(first.manufacturer_code, "123456");
        assert_eq!(first.manufacturer_name, "中外製薬株式会社");
        assert_eq!(first.source_filename, "test.xml");

        assert_eq!(records[1].essentials.yj_code, "4229101F2025");
        assert_eq!(records[0].clinical_info.indications, records[1].clinical_info.indications);
    }

    #[test]
    fn test_composition_scoped_and_deduplicated() {
        let records = extract(&two_product_document());

        assert_eq!(
            strings(&records[0].clinical_info.compositions),
            vec![
                "Active ingredient:カペシタビン:300mg",
                "Additive:乳糖水和物:50mg",
                "Additive:タルク",
            ]
        );
        assert_eq!(
            strings(&records[1].clinical_info.compositions)[0],
            "Active ingredient:カペシタビン:600mg"
        );
    }

    #[test]
    fn test_indications_with_classification_last() {
        let records = extract(&two_product_document());
        assert_eq!(
            strings(&records[0].clinical_info.indications),
            vec!["手術不能又は再発乳癌", "代謝拮抗剤"]
        );
    }

    #[test]
    fn test_active_ingredient_detail() {
        let records = extract(&two_product_document());
        let ingredients = &records[0].clinical_info.active_ingredients;

        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].general_name, "カペシタビン（Capecitabine）");
        assert_eq!(ingredients[0].molecular_formula, "C15H22FN3O6");
        assert_eq!(ingredients[0].molecular_weight, "359.35");
        assert!(ingredients[0].pka.is_none());
    }

    #[test]
    fn test_document_without_products() {
        let records = extract(&format!("<Warnings>{}</Warnings>", detail("警告文")));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].essentials.product_name, "");
        assert_eq!(strings(&records[0].clinical_info.warnings), vec!["警告文"]);
        assert!(records[0].clinical_info.dosage.is_empty());
    }

    #[test]
    fn test_form_falls_back_to_dosage_form() {
        let body = format!(
            r#"<DetailBrandName id="BRD_Drug1"><DosageForm>{}</DosageForm></DetailBrandName>"#,
            lang("錠剤")
        );
        let records = extract(&body);
        assert_eq!(records[0].essentials.form, "錠剤");
    }

    #[test]
    fn test_unknown_elements_are_tolerated() {
        let body = format!(
            "<VendorExtension><Whatever>{}</Whatever></VendorExtension><Warnings><Odd>{}</Odd></Warnings>",
            detail("ignored"),
            detail("kept")
        );
        let records = extract(&body);
        assert_eq!(strings(&records[0].clinical_info.warnings), vec!["kept"]);
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let extractor = DocumentExtractor::default_config().unwrap();
        let result = extractor.extract("broken.xml", b"<PackInsDoc><Unclosed></PackInsDoc>");
        assert!(matches!(result, Err(ExtractorError::Parse(_))));

        let result = extractor.extract("binary.xml", &[0xff, 0xfe, 0x00]);
        assert!(matches!(result, Err(ExtractorError::Encoding(_))));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let extractor = DocumentExtractor::default_config().unwrap();
        let bytes = doc(&two_product_document());

        let first = extractor.extract("a.xml", bytes.as_bytes()).unwrap();
        let second = extractor.extract("a.xml", bytes.as_bytes()).unwrap();

        assert_eq!(
            serde_json::to_string(&first.records).unwrap(),
            serde_json::to_string(&second.records).unwrap()
        );
        assert!(first.nodes_visited > 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ExtractorConfig {
            language: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            DocumentExtractor::new(config),
            Err(ExtractorError::Config(_))
        ));
    }
}
