//! Embedded first-name gender table.
//!
//! A compact subset of common given names with an unambiguous gender
//! association. Lookup is case-insensitive; anything absent classifies as
//! unknown, which the inclusive filter keeps anyway.

use super::Gender;

pub(super) const MALE_NAMES: &[&str] = &[
    "aaron", "adam", "adrian", "ahmed", "aidan", "alan", "albert", "alejandro", "alex",
    "alexander", "alfred", "ali", "allen", "andre", "andrew", "andy", "angelo", "anthony",
    "antonio", "arthur", "austin", "barry", "ben", "benjamin", "bernard", "bill", "billy",
    "blake", "bob", "bobby", "brad", "bradley", "brandon", "brendan", "brent", "brett", "brian",
    "bruce", "bryan", "caleb", "calvin", "cameron", "carl", "carlos", "cesar", "chad", "charles",
    "charlie", "chris", "christian", "christopher", "clark", "cody", "colin", "connor", "craig",
    "curtis", "dale", "damian", "dan", "daniel", "danny", "darren", "dave", "david", "dean",
    "dennis", "derek", "diego", "dominic", "don", "donald", "douglas", "dustin", "dylan", "earl",
    "eddie", "edgar", "eduardo", "edward", "edwin", "eli", "elias", "elijah", "emmanuel", "eric",
    "erik", "ernest", "ethan", "eugene", "evan", "felix", "fernando", "francis", "francisco",
    "frank", "fred", "gabriel", "gary", "gavin", "george", "gerald", "gilbert", "glen", "gordon",
    "graham", "grant", "greg", "gregory", "harold", "harry", "hassan", "hector", "henry",
    "howard", "hugo", "ian", "ibrahim", "isaac", "ivan", "jack", "jackson", "jacob", "jake",
    "james", "jamie", "jared", "jason", "javier", "jay", "jeff", "jeffrey", "jeremy", "jerome",
    "jerry", "jesse", "jim", "jimmy", "joe", "joel", "john", "johnny", "jon", "jonathan",
    "jorge", "jose", "joseph", "josh", "joshua", "juan", "julian", "justin", "karl", "keith",
    "ken", "kenneth", "kevin", "kurt", "kyle", "lance", "larry", "lawrence", "lee", "leo",
    "leon", "leonard", "levi", "lewis", "liam", "lloyd", "logan", "louis", "lucas", "luis",
    "luke", "manuel", "marc", "marcus", "mario", "mark", "martin", "marvin", "mason", "matt",
    "matthew", "maurice", "max", "maxwell", "melvin", "michael", "miguel", "mike", "mitchell",
    "mohamed", "mohammed", "nathan", "nathaniel", "neil", "nicholas", "nick", "noah", "norman",
    "oliver", "omar", "oscar", "owen", "patrick", "paul", "pedro", "peter", "philip", "phillip",
    "rafael", "ralph", "randy", "raul", "ray", "raymond", "ricardo", "richard", "rick", "robert",
    "roberto", "rodney", "roger", "roland", "ronald", "ross", "roy", "ruben", "russell", "ryan",
    "salvador", "sam", "samuel", "scott", "sean", "sergio", "seth", "shane", "shawn", "sidney",
    "simon", "spencer", "stanley", "stephen", "steve", "steven", "stuart", "ted", "terry",
    "theodore", "thomas", "tim", "timothy", "todd", "tom", "tommy", "tony", "travis", "trevor",
    "troy", "tyler", "vernon", "victor", "vincent", "walter", "warren", "wayne", "wesley",
    "will", "william", "willie", "xavier", "zachary",
];

pub(super) const FEMALE_NAMES: &[&str] = &[
    "abigail", "adriana", "aisha", "alexandra", "alexis", "alice", "alicia", "allison", "alyssa",
    "amanda", "amber", "amelia", "amy", "ana", "andrea", "angela", "angelica", "anita", "anna",
    "anne", "annette", "april", "ariana", "ashley", "audrey", "aurora", "autumn", "barbara",
    "beatrice", "becky", "belinda", "bella", "beth", "bethany", "betty", "beverly", "bianca",
    "bonnie", "brenda", "briana", "brittany", "brooke", "camila", "candace", "carla", "carmen",
    "carol", "caroline", "carolyn", "carrie", "cassandra", "catherine", "cathy", "cecilia",
    "celeste", "charlotte", "chelsea", "cheryl", "chloe", "christina", "christine", "cindy",
    "claire", "clara", "claudia", "colleen", "connie", "courtney", "crystal", "cynthia",
    "daniela", "danielle", "daphne", "dawn", "deborah", "debra", "delia", "denise", "diana",
    "diane", "dolores", "donna", "doris", "dorothy", "edith", "eileen", "elaine", "eleanor",
    "elena", "elizabeth", "ella", "ellen", "emily", "emma", "erica", "erin", "esther", "eva",
    "evelyn", "faith", "felicia", "fiona", "florence", "frances", "gabriela", "gabrielle",
    "gail", "gina", "giselle", "gloria", "grace", "gwendolyn", "hailey", "hannah", "heather",
    "heidi", "helen", "holly", "irene", "iris", "isabel", "isabella", "jacqueline", "jade",
    "jane", "janet", "janice", "jasmine", "jean", "jenna", "jennifer", "jenny", "jessica",
    "jill", "joan", "joanna", "jocelyn", "josephine", "joyce", "judith", "judy", "julia",
    "julie", "june", "karen", "katherine", "kathleen", "kathryn", "kathy", "katie", "katrina",
    "kayla", "kelly", "kimberly", "kristen", "kristina", "laura", "lauren", "leah", "leslie",
    "lillian", "lily", "linda", "lisa", "lori", "lorraine", "lucia", "lucy", "luna", "lydia",
    "lynn", "mabel", "mackenzie", "madeline", "madison", "maggie", "marcia", "margaret",
    "maria", "mariana", "marie", "marilyn", "marina", "marisol", "marjorie", "martha", "mary",
    "maureen", "maya", "megan", "melanie", "melissa", "mercedes", "michelle", "mildred",
    "miranda", "molly", "monica", "nadia", "nancy", "naomi", "natalia", "natalie", "nicole",
    "nina", "nora", "norma", "olivia", "paige", "pamela", "patricia", "paula", "pauline",
    "pearl", "peggy", "penelope", "phyllis", "priscilla", "rachel", "rebecca", "regina",
    "renee", "rita", "roberta", "robin", "rosa", "rose", "rosemary", "ruby", "ruth", "sabrina",
    "sally", "samantha", "sandra", "sarah", "savannah", "selena", "serena", "sharon", "sheila",
    "shelley", "sherry", "shirley", "silvia", "sofia", "sonia", "sophia", "stacey", "stella",
    "stephanie", "susan", "suzanne", "sylvia", "tamara", "tanya", "tara", "teresa", "tiffany",
    "tina", "tracy", "valentina", "valerie", "vanessa", "vera", "veronica", "vicky", "victoria",
    "violet", "virginia", "vivian", "wanda", "wendy", "whitney", "yolanda", "yvonne", "zoe",
];

/// Look up a single name token, case-insensitively.
pub(super) fn lookup(name: &str) -> Gender {
    let lower = name.to_ascii_lowercase();
    if MALE_NAMES.binary_search(&lower.as_str()).is_ok() {
        Gender::Male
    } else if FEMALE_NAMES.binary_search(&lower.as_str()).is_ok() {
        Gender::Female
    } else {
        Gender::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_sorted_for_binary_search() {
        assert!(MALE_NAMES.windows(2).all(|w| w[0] < w[1]));
        assert!(FEMALE_NAMES.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("John"), Gender::Male);
        assert_eq!(lookup("MARIA"), Gender::Female);
        assert_eq!(lookup("xx"), Gender::Unknown);
    }
}
