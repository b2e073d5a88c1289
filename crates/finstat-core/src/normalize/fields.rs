//! Canonical financial fields and their synonym tables.
//!
//! Every field has one canonical identifier (e.g. `REVENUE`), a Chinese
//! locale alias written next to it during canonicalization, and a static list
//! of accepted raw spellings across English, data-vendor column codes and
//! Chinese statement captions.

use serde::{Deserialize, Serialize};

/// The statement a canonical field lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    Income,
    Balance,
    CashFlow,
}

impl Statement {
    pub const ALL: [Statement; 3] = [Statement::Income, Statement::Balance, Statement::CashFlow];

    /// Accepted container keys for this statement, in lookup priority order.
    pub fn container_aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Income => &[
                "income_statement",
                "income",
                "profit_statement",
                "利润表",
                "损益表",
            ],
            Self::Balance => &["balance_sheet", "balance", "资产负债表"],
            Self::CashFlow => &[
                "cash_flow",
                "cashflow",
                "cash_flow_statement",
                "现金流量表",
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Balance => "balance",
            Self::CashFlow => "cash_flow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalField {
    Revenue,
    OperatingCost,
    GrossProfit,
    OperatingProfit,
    NetProfit,
    ParentNetProfit,
    TotalAssets,
    TotalLiabilities,
    Equity,
    CurrentAssets,
    CurrentLiabilities,
    Cash,
    Inventory,
    Receivables,
    FixedAssets,
    LongTermInvestments,
    OperatingCashFlow,
    InvestingCashFlow,
    InvestingCashFlowOut,
    FinancingCashFlow,
    DividendsPaid,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 21] = [
        CanonicalField::Revenue,
        CanonicalField::OperatingCost,
        CanonicalField::GrossProfit,
        CanonicalField::OperatingProfit,
        CanonicalField::NetProfit,
        CanonicalField::ParentNetProfit,
        CanonicalField::TotalAssets,
        CanonicalField::TotalLiabilities,
        CanonicalField::Equity,
        CanonicalField::CurrentAssets,
        CanonicalField::CurrentLiabilities,
        CanonicalField::Cash,
        CanonicalField::Inventory,
        CanonicalField::Receivables,
        CanonicalField::FixedAssets,
        CanonicalField::LongTermInvestments,
        CanonicalField::OperatingCashFlow,
        CanonicalField::InvestingCashFlow,
        CanonicalField::InvestingCashFlowOut,
        CanonicalField::FinancingCashFlow,
        CanonicalField::DividendsPaid,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Revenue => "REVENUE",
            Self::OperatingCost => "OPERATING_COST",
            Self::GrossProfit => "GROSS_PROFIT",
            Self::OperatingProfit => "OPERATING_PROFIT",
            Self::NetProfit => "NET_PROFIT",
            Self::ParentNetProfit => "PARENT_NET_PROFIT",
            Self::TotalAssets => "TOTAL_ASSETS",
            Self::TotalLiabilities => "TOTAL_LIABILITIES",
            Self::Equity => "EQUITY",
            Self::CurrentAssets => "CURRENT_ASSETS",
            Self::CurrentLiabilities => "CURRENT_LIABILITIES",
            Self::Cash => "CASH",
            Self::Inventory => "INVENTORY",
            Self::Receivables => "RECEIVABLES",
            Self::FixedAssets => "FIXED_ASSETS",
            Self::LongTermInvestments => "LONG_TERM_INVESTMENTS",
            Self::OperatingCashFlow => "OPERATING_CASH_FLOW",
            Self::InvestingCashFlow => "INVESTING_CASH_FLOW",
            Self::InvestingCashFlowOut => "INVESTING_CASH_FLOW_OUT",
            Self::FinancingCashFlow => "FINANCING_CASH_FLOW",
            Self::DividendsPaid => "DIVIDENDS_PAID",
        }
    }

    /// Chinese caption written alongside the canonical id.
    pub fn locale_alias(&self) -> &'static str {
        match self {
            Self::Revenue => "营业收入",
            Self::OperatingCost => "营业成本",
            Self::GrossProfit => "毛利润",
            Self::OperatingProfit => "营业利润",
            Self::NetProfit => "净利润",
            Self::ParentNetProfit => "归属于母公司所有者的净利润",
            Self::TotalAssets => "资产总计",
            Self::TotalLiabilities => "负债合计",
            Self::Equity => "所有者权益合计",
            Self::CurrentAssets => "流动资产合计",
            Self::CurrentLiabilities => "流动负债合计",
            Self::Cash => "货币资金",
            Self::Inventory => "存货",
            Self::Receivables => "应收账款",
            Self::FixedAssets => "固定资产",
            Self::LongTermInvestments => "长期投资",
            Self::OperatingCashFlow => "经营活动产生的现金流量净额",
            Self::InvestingCashFlow => "投资活动产生的现金流量净额",
            Self::InvestingCashFlowOut => "投资活动现金流出小计",
            Self::FinancingCashFlow => "筹资活动产生的现金流量净额",
            Self::DividendsPaid => "分配股利、利润或偿付利息支付的现金",
        }
    }

    pub fn statement(&self) -> Statement {
        match self {
            Self::Revenue
            | Self::OperatingCost
            | Self::GrossProfit
            | Self::OperatingProfit
            | Self::NetProfit
            | Self::ParentNetProfit => Statement::Income,
            Self::TotalAssets
            | Self::TotalLiabilities
            | Self::Equity
            | Self::CurrentAssets
            | Self::CurrentLiabilities
            | Self::Cash
            | Self::Inventory
            | Self::Receivables
            | Self::FixedAssets
            | Self::LongTermInvestments => Statement::Balance,
            Self::OperatingCashFlow
            | Self::InvestingCashFlow
            | Self::InvestingCashFlowOut
            | Self::FinancingCashFlow
            | Self::DividendsPaid => Statement::CashFlow,
        }
    }

    /// Accepted raw spellings, highest priority first. The canonical id and
    /// locale alias are always the first two entries.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Self::Revenue => &[
                "REVENUE",
                "营业收入",
                "TOTAL_OPERATE_INCOME",
                "OPERATE_INCOME",
                "revenue",
                "total_revenue",
                "operating_revenue",
                "sales",
                "营业总收入",
                "主营业务收入",
            ],
            Self::OperatingCost => &[
                "OPERATING_COST",
                "营业成本",
                "TOTAL_OPERATE_COST",
                "OPERATE_COST",
                "cost_of_goods_sold",
                "cost_of_revenue",
                "operating_cost",
                "cogs",
                "营业总成本",
            ],
            Self::GrossProfit => &["GROSS_PROFIT", "毛利润", "gross_profit", "毛利"],
            Self::OperatingProfit => &[
                "OPERATING_PROFIT",
                "营业利润",
                "OPERATE_PROFIT",
                "operating_profit",
                "operating_income",
            ],
            Self::NetProfit => &[
                "NET_PROFIT",
                "净利润",
                "NETPROFIT",
                "net_profit",
                "net_income",
            ],
            Self::ParentNetProfit => &[
                "PARENT_NET_PROFIT",
                "归属于母公司所有者的净利润",
                "PARENT_NETPROFIT",
                "parent_net_profit",
                "net_profit_attributable",
                "归母净利润",
                "归属于母公司股东的净利润",
            ],
            Self::TotalAssets => &[
                "TOTAL_ASSETS",
                "资产总计",
                "total_assets",
                "总资产",
                "资产合计",
            ],
            Self::TotalLiabilities => &[
                "TOTAL_LIABILITIES",
                "负债合计",
                "total_liabilities",
                "总负债",
            ],
            Self::Equity => &[
                "EQUITY",
                "所有者权益合计",
                "TOTAL_EQUITY",
                "total_equity",
                "shareholders_equity",
                "owners_equity",
                "股东权益合计",
                "所有者权益",
                "股东权益",
                "净资产",
            ],
            Self::CurrentAssets => &[
                "CURRENT_ASSETS",
                "流动资产合计",
                "TOTAL_CURRENT_ASSETS",
                "current_assets",
                "流动资产",
            ],
            Self::CurrentLiabilities => &[
                "CURRENT_LIABILITIES",
                "流动负债合计",
                "TOTAL_CURRENT_LIABILITIES",
                "current_liabilities",
                "流动负债",
            ],
            Self::Cash => &[
                "CASH",
                "货币资金",
                "MONETARY_FUNDS",
                "cash",
                "cash_and_equivalents",
                "现金及现金等价物",
            ],
            Self::Inventory => &["INVENTORY", "存货", "inventory", "inventories"],
            Self::Receivables => &[
                "RECEIVABLES",
                "应收账款",
                "ACCOUNTS_RECEIVABLE",
                "ACCOUNTS_RECE",
                "accounts_receivable",
                "receivables",
            ],
            Self::FixedAssets => &[
                "FIXED_ASSETS",
                "固定资产",
                "FIXED_ASSETS_NET",
                "fixed_assets",
                "固定资产净值",
            ],
            Self::LongTermInvestments => &[
                "LONG_TERM_INVESTMENTS",
                "长期投资",
                "LONG_TERM_INVESTMENT",
                "long_term_investments",
                "long_term_investment",
                "长期股权投资",
            ],
            Self::OperatingCashFlow => &[
                "OPERATING_CASH_FLOW",
                "经营活动产生的现金流量净额",
                "CASH_FLOW_OPERATE",
                "NETCASH_OPERATE",
                "CASH_FLOW_FROM_OPERATING_ACTIVITIES",
                "operating_cash_flow",
                "经营活动现金流量净额",
                "经营活动现金流",
            ],
            Self::InvestingCashFlow => &[
                "INVESTING_CASH_FLOW",
                "投资活动产生的现金流量净额",
                "NETCASH_INVEST",
                "investing_cash_flow",
                "投资活动现金流量净额",
                "投资活动现金流",
            ],
            Self::InvestingCashFlowOut => &[
                "INVESTING_CASH_FLOW_OUT",
                "投资活动现金流出小计",
                "capex",
                "capital_expenditure",
                "购建固定资产、无形资产和其他长期资产支付的现金",
            ],
            Self::FinancingCashFlow => &[
                "FINANCING_CASH_FLOW",
                "筹资活动产生的现金流量净额",
                "NETCASH_FINANCE",
                "financing_cash_flow",
                "筹资活动现金流量净额",
                "筹资活动现金流",
            ],
            Self::DividendsPaid => &[
                "DIVIDENDS_PAID",
                "分配股利、利润或偿付利息支付的现金",
                "dividends_paid",
                "dividends",
                "支付的股利",
            ],
        }
    }

    /// Short generic captions accepted only as exact top-level flat keys.
    /// They are too broad for substring or keyword matching.
    pub fn loose_synonyms(&self) -> &'static [&'static str] {
        match self {
            Self::Revenue => &["收入", "sales_revenue"],
            Self::NetProfit => &["利润", "profit"],
            Self::TotalAssets => &["assets", "资产"],
            Self::TotalLiabilities => &["liabilities", "负债"],
            Self::Equity => &["equity"],
            Self::Cash => &["现金", "现金等价物"],
            _ => &[],
        }
    }

    /// Exact synonym lookup (case-sensitive, whitespace-trimmed).
    pub fn from_synonym(key: &str) -> Option<CanonicalField> {
        let key = key.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.synonyms().contains(&key))
    }

    /// Exact lookup including loose synonyms, for top-level flat metrics.
    pub fn from_flat_key(key: &str) -> Option<CanonicalField> {
        let key = key.trim();
        Self::from_synonym(key).or_else(|| {
            Self::ALL
                .iter()
                .copied()
                .find(|f| f.loose_synonyms().contains(&key))
        })
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Prefixes that mark a flat key as belonging to the prior period.
const PREVIOUS_PERIOD_PREFIXES: &[&str] = &["previous_", "prev_", "prior_", "上期", "上年"];

/// Resolve a top-level flat key to a field and a period offset (0 = current,
/// 1 = previous).
pub fn resolve_flat_key(key: &str) -> Option<(CanonicalField, usize)> {
    if let Some(field) = CanonicalField::from_flat_key(key) {
        return Some((field, 0));
    }
    let trimmed = key.trim();
    PREVIOUS_PERIOD_PREFIXES.iter().find_map(|prefix| {
        trimmed
            .strip_prefix(prefix)
            .and_then(CanonicalField::from_flat_key)
            .map(|field| (field, 1))
    })
}

/// Keys that carry a period label (report date or fiscal year).
pub const PERIOD_KEYS: &[&str] = &[
    "REPORT_DATE",
    "report_date",
    "报告期",
    "reporting_period",
    "period",
    "year",
    "年份",
    "年度",
];

/// Keys that carry the subject (company) name.
pub const SUBJECT_KEYS: &[&str] = &[
    "company_name",
    "company",
    "stock_name",
    "公司名称",
    "公司",
    "name",
];

/// Containers that hold a multi-period history.
pub const HISTORY_KEYS: &[&str] = &[
    "historical_data",
    "historical",
    "history",
    "历史数据",
];

/// Keys of the years array inside a historical-series container.
pub const YEARS_KEYS: &[&str] = &["years", "年份", "year", "periods"];
