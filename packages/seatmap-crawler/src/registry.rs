//! Static carrier registry.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::CarrierRecord;

/// Embedded carrier table: IATA code, Chinese name, English name.
const CARRIERS: &[(&str, &str, &str)] = &[
    ("3K", "捷星亚洲航空", "Jetstar Asia Airways"),
    ("9W", "捷特航空", "Jet Airways"),
    ("AA", "美国航空", "American Airlines"),
    ("AB", "柏林航空", "Air Berlin"),
    ("AC", "加拿大航空", "Air Canada"),
    ("AD", "蓝翼航空", "Azul Brazilian Airlines"),
    ("AF", "法国航空", "Air France"),
    ("AI", "印度航空", "Air India"),
    ("AK", "亚洲航空", "AirAsia"),
    ("AM", "墨西哥国际航空", "Aeromexico"),
    ("AR", "阿根廷航空", "Aerolineas Argentinas"),
    ("AS", "阿拉斯加航空", "Alaska Airlines"),
    ("AT", "摩洛哥皇家航空", "Royal Air Maroc"),
    ("AV", "哥伦比亚航空", "Avianca"),
    ("AY", "芬兰航空", "Finnair"),
    ("AZ", "意大利航空", "Alitalia"),
    ("BA", "英国航空", "British Airways"),
    ("BI", "文莱皇家航空", "Royal Brunei Airlines"),
    ("BL", "捷星太平洋航空", "Jetstar Pacific Airlines"),
    ("BR", "长荣航空", "EVA Air"),
    ("BX", "釜山航空", "Air Busan"),
    ("CA", "中国国际航空", "Air China"),
    ("CI", "中华航空", "China Airlines"),
    ("CK", "中国货运航空", "China Cargo Airlines"),
    ("CM", "巴拿马航空", "Copa Airlines"),
    ("CX", "国泰航空", "Cathay Pacific"),
    ("CZ", "中国南方航空", "China Southern Airlines"),
    ("D7", "亚洲航空X", "AirAsia X"),
    ("DL", "达美航空", "Delta Air Lines"),
    ("DY", "挪威航空", "Norwegian Air Shuttle"),
    ("EI", "爱尔兰航空", "Aer Lingus"),
    ("EK", "阿联酋航空", "Emirates"),
    ("ET", "埃塞俄比亚航空", "Ethiopian Airlines"),
    ("EY", "阿提哈德航空", "Etihad Airways"),
    ("FD", "亚洲航空", "Thai AirAsia"),
    ("FI", "冰岛航空", "Icelandair"),
    ("FM", "上海航空", "Shanghai Airlines"),
    ("FR", "瑞安航空", "Ryanair"),
    ("GA", "印尼鹰航", "Garuda Indonesia"),
    ("GF", "海湾航空", "Gulf Air"),
    ("GS", "天津航空", "Tianjin Airlines"),
    ("HO", "吉祥航空", "Juneyao Airlines"),
    ("HU", "海南航空", "Hainan Airlines"),
    ("HX", "香港航空", "Hong Kong Airlines"),
    ("IB", "西班牙国家航空", "Iberia"),
    ("IT", "台湾虎航", "Tigerair Taiwan"),
    ("JD", "首都航空", "Beijing Capital Airlines"),
    ("JJ", "巴西天马航空", "TAM Airlines"),
    ("JL", "日本航空", "Japan Airlines"),
    ("JQ", "捷星航空", "Jetstar Airways"),
    ("JX", "星悦航空", "Starlux Airlines"),
    ("KA", "港龙航空", "Dragonair"),
    ("KE", "大韩航空", "Korean Air"),
    ("KL", "荷兰皇家航空", "KLM Royal Dutch Airlines"),
    ("KQ", "肯尼亚航空", "Kenya Airways"),
    ("LA", "南美航空", "LATAM Airlines"),
    ("LH", "汉莎航空", "Lufthansa"),
    ("LO", "波兰航空", "LOT Polish Airlines"),
    ("LX", "瑞士国际航空", "Swiss International Air Lines"),
    ("MF", "厦门航空", "Xiamen Airlines"),
    ("MH", "马来西亚航空", "Malaysia Airlines"),
    ("MS", "埃及航空", "EgyptAir"),
    ("MU", "中国东方航空", "China Eastern Airlines"),
    ("NH", "全日空航空", "All Nippon Airways"),
    ("NX", "澳门航空", "Air Macau"),
    ("NZ", "新西兰航空", "Air New Zealand"),
    ("OD", "马来西亚马印航空", "Malindo Air"),
    ("OK", "捷克航空", "Czech Airlines"),
    ("OM", "蒙古民用航空", "MIAT Mongolian Airlines"),
    ("OS", "奥地利航空", "Austrian Airlines"),
    ("OZ", "韩亚航空", "Asiana Airlines"),
    ("PG", "曼谷航空", "Bangkok Airways"),
    ("PR", "菲律宾航空", "Philippine Airlines"),
    ("PX", "新几内亚航空", "Air Niugini"),
    ("QF", "澳洲航空", "Qantas"),
    ("QR", "卡塔尔航空", "Qatar Airways"),
    ("RJ", "约旦皇家航空", "Royal Jordanian"),
    ("RO", "罗马尼亚航空", "TAROM"),
    ("SA", "南非航空", "South African Airways"),
    ("SJ", "山东航空", "Shandong Airlines"),
    ("SK", "北欧航空", "Scandinavian Airlines"),
    ("SN", "布鲁塞尔航空", "Brussels Airlines"),
    ("SQ", "新加坡航空", "Singapore Airlines"),
    ("SU", "俄罗斯航空", "Aeroflot"),
    ("SV", "沙特阿拉伯航空", "Saudi Arabian Airlines"),
    ("TG", "泰国国际航空", "Thai Airways International"),
    ("TK", "土耳其航空", "Turkish Airlines"),
    ("TP", "葡萄牙航空", "TAP Air Portugal"),
    ("TR", "酷航", "Scoot"),
    ("TZ", "胜安航空", "SilkAir"),
    ("UA", "美国联合航空", "United Airlines"),
    ("UL", "斯里兰卡航空", "SriLankan Airlines"),
    ("UN", "乌拉尔航空", "Ural Airlines"),
    ("UO", "香港快运航空", "HK Express"),
    ("US", "全美航空", "US Airways"),
    ("VA", "维珍澳洲航空", "Virgin Australia"),
    ("VN", "越南航空", "Vietnam Airlines"),
    ("VS", "维珍航空", "Virgin Atlantic"),
    ("WF", "宽体航空", "Wideroe"),
    ("WN", "西南航空", "Southwest Airlines"),
    ("XJ", "泰国亚洲航空", "Thai AirAsia X"),
    ("Y8", "超翔航空", "Suparna Airlines"),
    ("ZH", "深圳航空", "Shenzhen Airlines"),
];

/// Read-only mapping of supported carrier codes to display names.
///
/// Built once at startup and shared by reference; codes are stored
/// upper-cased and iterate in code order.
#[derive(Debug, Clone)]
pub struct Registry {
    carriers: BTreeMap<String, CarrierRecord>,
}

impl Registry {
    /// Registry backed by the embedded carrier table.
    pub fn builtin() -> Self {
        Self::from_records(
            CARRIERS
                .iter()
                .map(|(code, primary, secondary)| CarrierRecord::new(*code, *primary, *secondary)),
        )
    }

    /// Registry over arbitrary records. Later duplicates replace earlier ones.
    pub fn from_records(records: impl IntoIterator<Item = CarrierRecord>) -> Self {
        let carriers = records
            .into_iter()
            .map(|mut record| {
                record.iata_code = normalize_code(&record.iata_code);
                (record.iata_code.clone(), record)
            })
            .collect();
        Self { carriers }
    }

    /// Case-insensitive lookup; surrounding whitespace is ignored.
    pub fn lookup(&self, code: &str) -> Option<&CarrierRecord> {
        self.carriers.get(&normalize_code(code))
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.lookup(code).is_some()
    }

    /// Every carrier, ordered by code.
    pub fn all(&self) -> Vec<&CarrierRecord> {
        self.carriers.values().collect()
    }

    pub fn supported_codes(&self) -> BTreeSet<String> {
        self.carriers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.carriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carriers.is_empty()
    }

    /// Carriers whose primary or secondary name contains `fragment`,
    /// ignoring case.
    pub fn search_by_name(&self, fragment: &str) -> Vec<&CarrierRecord> {
        let needle = fragment.trim().to_lowercase();
        if needle.is_empty() {
            return vec![];
        }
        self.carriers
            .values()
            .filter(|c| {
                c.display_name_primary.to_lowercase().contains(&needle)
                    || c.display_name_secondary.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Carriers whose code starts with `prefix`, ignoring case.
    pub fn by_prefix(&self, prefix: &str) -> Vec<&CarrierRecord> {
        let prefix = normalize_code(prefix);
        self.carriers
            .values()
            .filter(|c| c.iata_code.starts_with(&prefix))
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = Registry::builtin();

        let carrier = registry.lookup(" ca ").unwrap();
        assert_eq!(carrier.iata_code, "CA");
        assert_eq!(carrier.display_name_primary, "中国国际航空");
        assert_eq!(carrier.display_name_secondary, "Air China");

        assert!(registry.is_supported("mu"));
        assert!(registry.lookup("ZZ").is_none());
    }

    #[test]
    fn test_all_is_ordered() {
        let registry = Registry::builtin();
        let codes: Vec<_> = registry.all().iter().map(|c| c.iata_code.clone()).collect();

        let mut sorted = codes.clone();
        sorted.sort();
        assert_eq!(codes, sorted);
        assert_eq!(codes.len(), registry.supported_codes().len());
        assert_eq!(codes.first().map(String::as_str), Some("3K"));
    }

    #[test]
    fn test_search_by_name() {
        let registry = Registry::builtin();

        let english: Vec<_> = registry
            .search_by_name("CHINA")
            .iter()
            .map(|c| c.iata_code.as_str())
            .collect();
        assert!(english.contains(&"CA"));
        assert!(english.contains(&"CI"));

        let chinese = registry.search_by_name("东方");
        assert_eq!(chinese.len(), 1);
        assert_eq!(chinese[0].iata_code, "MU");

        assert!(registry.search_by_name("  ").is_empty());
    }

    #[test]
    fn test_by_prefix() {
        let registry = Registry::from_records(vec![
            CarrierRecord::new("ca", "A", "Air China"),
            CarrierRecord::new("CX", "B", "Cathay Pacific"),
            CarrierRecord::new("MU", "C", "China Eastern"),
        ]);

        let codes: Vec<_> = registry.by_prefix("c").iter().map(|c| c.iata_code.as_str()).collect();

        assert_eq!(codes, vec!["CA", "CX"]);
        assert_eq!(registry.len(), 3);
    }
}
